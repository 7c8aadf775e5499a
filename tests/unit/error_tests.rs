//! Display format and exit-code mapping for `AppError`.

use agent_duet::AppError;

#[test]
fn display_prefixes_identify_category() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Provisioning("x".into()), "provisioning: x"),
        (AppError::Launch("x".into()), "launch: x"),
        (AppError::ShutdownTimeout("x".into()), "shutdown timeout: x"),
        (AppError::Server("x".into()), "server: x"),
        (AppError::Io("x".into()), "io: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn fatal_categories_map_to_distinct_nonzero_exit_codes() {
    let config = AppError::Config(String::new()).exit_code();
    let provisioning = AppError::Provisioning(String::new()).exit_code();
    let launch = AppError::Launch(String::new()).exit_code();
    let timeout = AppError::ShutdownTimeout(String::new()).exit_code();

    let codes = [config, provisioning, launch, timeout];
    assert!(codes.iter().all(|c| *c != 0));
    for (i, a) in codes.iter().enumerate() {
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn io_error_converts_to_io_variant() {
    let err: AppError = std::io::Error::other("disk gone").into();
    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn implements_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&AppError::Launch("missing binary".into()));
}

use crate::error::{AppError, StorageError};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "DUETASK_DISABLE_NOTIFICATIONS";

/// Presents non-fatal problems to the user.
pub trait Notifier {
    fn alert(&self, title: &str, body: &str) -> Result<(), AppError>;
}

/// Writes alerts to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, title: &str, body: &str) -> Result<(), AppError> {
        eprintln!("WARNING: {title}: {body}");
        Ok(())
    }
}

/// Desktop notifications when asked for and available, stderr otherwise.
pub fn notifier_for(desktop_alerts: bool) -> Box<dyn Notifier> {
    if !desktop_alerts || std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Box::new(ConsoleNotifier);
    }

    match platform_notifier() {
        Ok(notifier) => notifier,
        Err(err) => {
            log::debug!("desktop alerts unavailable: {err}");
            Box::new(ConsoleNotifier)
        }
    }
}

pub fn storage_alert_title(err: &StorageError) -> &'static str {
    match err {
        StorageError::ReadFailed { .. } | StorageError::ParseFailed { .. } => {
            "Could not load saved tasks"
        }
        StorageError::WriteFailed { .. } => "Could not save tasks",
    }
}

/// Shows each storage error once. An alert that cannot be shown is logged and
/// otherwise ignored.
pub fn surface_storage_errors(notifier: &dyn Notifier, errors: &[StorageError]) {
    for err in errors {
        if let Err(alert_err) = notifier.alert(storage_alert_title(err), &err.to_string()) {
            log::warn!("could not show alert for {}: {alert_err}", err.code());
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::{Notifier, storage_alert_title, surface_storage_errors};
    use crate::error::{AppError, StorageError};
    use std::cell::RefCell;

    #[derive(Default)]
    struct MockNotifier {
        alerts: RefCell<Vec<(String, String)>>,
    }

    impl Notifier for MockNotifier {
        fn alert(&self, title: &str, body: &str) -> Result<(), AppError> {
            self.alerts
                .borrow_mut()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn alert(&self, _title: &str, _body: &str) -> Result<(), AppError> {
            Err(AppError::io("no display"))
        }
    }

    #[test]
    fn surface_storage_errors_alerts_each_error() {
        let notifier = MockNotifier::default();
        let errors = vec![
            StorageError::parse_failed("tasks", "expected value"),
            StorageError::write_failed("completed_tasks", "disk full"),
        ];

        surface_storage_errors(&notifier, &errors);

        let alerts = notifier.alerts.borrow();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].0, "Could not load saved tasks");
        assert_eq!(alerts[0].1, "failed to parse 'tasks': expected value");
        assert_eq!(alerts[1].0, "Could not save tasks");
        assert!(alerts[1].1.contains("disk full"));
    }

    #[test]
    fn surface_storage_errors_tolerates_failing_notifier() {
        surface_storage_errors(
            &FailingNotifier,
            &[StorageError::read_failed("tasks", "permission denied")],
        );
    }

    #[test]
    fn alert_titles_follow_error_kind() {
        assert_eq!(
            storage_alert_title(&StorageError::read_failed("tasks", "x")),
            "Could not load saved tasks"
        );
        assert_eq!(
            storage_alert_title(&StorageError::write_failed("tasks", "x")),
            "Could not save tasks"
        );
    }
}

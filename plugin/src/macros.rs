/// Logs a line tagged with a component name.
///
/// The component becomes the record target, so the `fern` format in
/// [`crate::logging`] prints it between level and pid:
/// ```text
/// [2026-10-18T16:32:10+02:00][INFO ][activation][pid=4568][tid=ThreadId(3)] d3d11.dll resident
/// ```
/// Usage:
/// ```ignore
/// fe_log!(Level::Info, "loader", "Blocking load: {}", name);
/// ```
#[macro_export]
macro_rules! fe_log {
    ($level:expr, $component:expr, $($arg:tt)+) => {
        log::log!(target: $component, $level, $($arg)+)
    };
}

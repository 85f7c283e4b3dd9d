use std::time::Duration;

use doors_core::JobControl;

/// Blocks while the job is paused. Returns true when a stop was requested,
/// whether before or during the wait.
pub async fn wait_while_paused(control: &JobControl, poll: Duration) -> bool {
    while control.should_wait() {
        tokio::time::sleep(poll).await;
    }
    control.is_stopped()
}

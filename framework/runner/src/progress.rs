use std::cmp::min;
use std::fmt::Write;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};

use crate::stop::StopListener;

/// Displays a progress bar while the engine is running to show the user how long is left.
///
/// Returns `None` if the progress thread could not be started, which does not affect the run.
pub(crate) fn start_progress(
    planned_runtime: Duration,
    stop_listener: StopListener,
) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();
            let pb = ProgressBar::new(planned_runtime.as_secs());
            let style = match ProgressStyle::with_template(
                "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]",
            ) {
                Ok(style) => style,
                Err(e) => {
                    log::warn!("Failed to set progress style: {e}");
                    return;
                }
            };
            pb.set_style(
                style
                    .with_key("planned_runtime", {
                        let hours = planned_runtime.as_secs() / 3600;
                        let minutes = (planned_runtime.as_secs() % 3600) / 60;
                        let seconds = planned_runtime.as_secs() % 60;
                        move |_state: &ProgressState, w: &mut dyn Write| {
                            let _ = write!(w, "{hours:02}:{minutes:02}:{seconds:02}");
                        }
                    })
                    .progress_chars("#>-"),
            );

            loop {
                let new = min(start_time.elapsed().as_secs(), planned_runtime.as_secs());
                pb.set_position(new);

                if stop_listener.wait_for_stop(Duration::from_secs(1)) {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("Failed to start progress thread: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::StopHandle;

    #[test]
    fn progress_thread_exits_on_stop() {
        let handle = StopHandle::default();
        let progress = start_progress(Duration::from_secs(60), handle.new_listener())
            .expect("failed to start progress thread");

        handle.stop();

        progress.join().expect("progress thread panicked");
    }
}

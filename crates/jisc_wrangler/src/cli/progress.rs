//! Progress bars fed from engine progress channels

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use jisc_scout::{RestructureProgress, RewriteProgress};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Run `work` on a scoped worker thread while `display` drains its progress
/// events on this one. `display` returns once the worker drops its sender.
pub fn run_with_progress<E, T, W, D>(work: W, display: D) -> Result<T>
where
    E: Send,
    T: Send,
    W: FnOnce(Sender<E>) -> T + Send,
    D: FnOnce(Receiver<E>),
{
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        let worker = scope.spawn(move || work(tx));
        display(rx);
        worker.join().map_err(|_| anyhow!("worker thread panicked"))
    })
}

fn new_bar(len: usize, unit: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let template = format!(
        "[{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} {} {{wide_msg}}",
        unit
    );
    let style = ProgressStyle::with_template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(len as u64).with_style(style)
}

/// One tick per title group.
pub fn show_restructure(rx: Receiver<RestructureProgress>, visible: bool) {
    let mut bar: Option<ProgressBar> = None;
    for event in rx {
        match event {
            RestructureProgress::Started { total_groups, .. } => {
                bar = Some(new_bar(total_groups, "groups", visible));
            }
            RestructureProgress::GroupDone { key, .. } => {
                if let Some(ref bar) = bar {
                    bar.set_message(key);
                    bar.inc(1);
                }
            }
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

/// One tick per metadata file.
pub fn show_rewrite(rx: Receiver<RewriteProgress>, visible: bool) {
    let mut bar: Option<ProgressBar> = None;
    for event in rx {
        match event {
            RewriteProgress::Started { total_files } => {
                bar = Some(new_bar(total_files, "files", visible));
            }
            RewriteProgress::FileDone => {
                if let Some(ref bar) = bar {
                    bar.inc(1);
                }
            }
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sees_every_event_then_returns() {
        let result = run_with_progress(
            |tx: Sender<usize>| {
                for i in 0..5 {
                    tx.send(i).unwrap();
                }
                "done"
            },
            |rx| assert_eq!(rx.iter().sum::<usize>(), 10),
        )
        .unwrap();
        assert_eq!(result, "done");
    }

    #[test]
    fn worker_panic_becomes_error() {
        let result: Result<()> = run_with_progress(
            |_tx: Sender<()>| panic!("boom"),
            |rx| for _ in rx {},
        );
        assert!(result.is_err());
    }

    #[test]
    fn hidden_bars_still_drain() {
        let (tx, rx) = mpsc::channel();
        tx.send(RestructureProgress::Started {
            total_files: 2,
            total_groups: 1,
        })
        .unwrap();
        tx.send(RestructureProgress::GroupDone {
            key: "BNWL".into(),
            files: 2,
        })
        .unwrap();
        drop(tx);
        show_restructure(rx, false);
    }
}

//! Periodic task driving: a registered task fires on a fixed interval, up to
//! an optional repeat cap, as an independent concurrent activity decoupled
//! from the main read loop.

use std::rc::Rc;
use std::time::Duration;

use log::warn;

use crate::bot::BotHandle;
use crate::registry::TaskHandler;

enum TaskStep {
    /// The task was unloaded (its cog went away) between iterations.
    Removed,
    /// `max_repeat` was already reached.
    Capped,
    Run {
        handler: TaskHandler,
        interval_secs: f64,
    },
}

/// Looks up the task, checks its repeat cap, and increments `current_repeat`
/// *before* returning the handler to run — the first invocation observes
/// `current_repeat == 1`.
fn step(bot: &BotHandle, task_id: &str) -> TaskStep {
    bot.with_registry_mut(|registry| match registry.tasks.get_mut(task_id) {
        None => TaskStep::Removed,
        Some(desc) => {
            if let Some(max) = desc.max_repeat {
                if desc.current_repeat >= max {
                    return TaskStep::Capped;
                }
            }
            desc.current_repeat += 1;
            TaskStep::Run {
                handler: desc.handler.clone(),
                interval_secs: desc.interval_secs,
            }
        }
    })
}

async fn drive(bot: BotHandle, task_id: String, args: Rc<Vec<String>>) {
    loop {
        if !bot.is_running() {
            break;
        }
        match step(&bot, &task_id) {
            TaskStep::Removed | TaskStep::Capped => break,
            TaskStep::Run {
                handler,
                interval_secs,
            } => match handler(bot.clone(), args.clone()).await {
                Ok(()) => tokio::time::sleep(Duration::from_secs_f64(interval_secs)).await,
                Err(e) => {
                    warn!(target: "cogbot::task", "task '{}' errored, stopping: {}", task_id, e);
                    break;
                }
            },
        }
    }
}

/// Launches the driver for a registered task on its own local task. Returns
/// immediately; the driver runs independently of the caller.
pub fn start_task(bot: &BotHandle, task_id: &str, args: Vec<String>) {
    let bot = bot.clone();
    let task_id = task_id.to_owned();
    let args = Rc::new(args);
    tokio::task::spawn_local(drive(bot, task_id, args));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{HandlerResult, Registry, TaskDescriptor};
    use std::cell::Cell;

    fn counting_handler(count: Rc<Cell<u64>>) -> TaskHandler {
        Rc::new(move |_bot, _args| {
            let count = count.clone();
            Box::pin(async move {
                count.set(count.get() + 1);
                let r: HandlerResult = Ok(());
                r
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn task_runs_exactly_max_repeat_times() {
        tokio::task::LocalSet::new()
            .run_until(async {
                let bot = crate::bot::Bot::new(crate::bot::BotConfig::default());
                let handle = bot.handle();
                let count = Rc::new(Cell::new(0u64));
                handle.with_registry_mut(|r: &mut Registry| {
                    r.tasks.insert(
                        "tick".to_owned(),
                        TaskDescriptor {
                            handler: counting_handler(count.clone()),
                            interval_secs: 0.0,
                            max_repeat: Some(3),
                            current_repeat: 0,
                        },
                    );
                });

                start_task(&handle, "tick", vec![]);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }

                assert_eq!(count.get(), 3);
            })
            .await;
    }
}

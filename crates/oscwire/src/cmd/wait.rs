use std::sync::Arc;

use oscwire_feedback::{
    Comparison, FeedbackMatcher, Host, InboundDispatcher, ReceivedStateStore, Variables,
};
use oscwire_frame::OscMessage;
use oscwire_transport::{configure, Status};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cmd::{feedback_port, parse_duration, WaitArgs};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, TIMEOUT, TRANSPORT_ERROR};
use crate::output::{print_message, OutputFormat};

enum HostEvent {
    Status(Status),
    Check,
}

/// Host that turns feedback checks into events for the wait loop.
struct WaitHost {
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl Host for WaitHost {
    fn update_status(&self, status: Status) {
        let _ = self.tx.send(HostEvent::Status(status));
    }

    fn set_variable_values(&self, values: Variables) {
        debug!(?values, "variables updated");
    }

    fn check_feedbacks(&self) {
        let _ = self.tx.send(HostEvent::Check);
    }
}

/// The single feedback a `wait` evaluates.
#[derive(Debug, PartialEq)]
enum Predicate {
    Arguments {
        expected: String,
        comparison: Comparison,
    },
    Indexed {
        index: usize,
        comparison: Comparison,
        target: String,
    },
    Presence,
}

impl Predicate {
    fn from_args(args: &WaitArgs) -> Self {
        let comparison = Comparison::from(args.comparison.as_str());
        match (&args.args, args.index, &args.target) {
            (Some(expected), _, _) => Predicate::Arguments {
                expected: expected.clone(),
                comparison,
            },
            (None, Some(index), Some(target)) => Predicate::Indexed {
                index,
                comparison,
                target: target.clone(),
            },
            _ => Predicate::Presence,
        }
    }

    fn holds(&self, matcher: &FeedbackMatcher, address: &str) -> bool {
        match self {
            Predicate::Arguments {
                expected,
                comparison,
            } => matcher.match_arguments(address, expected, comparison),
            Predicate::Indexed {
                index,
                comparison,
                target,
            } => matcher.match_indexed(address, *index, comparison, target),
            Predicate::Presence => matcher.check_presence(address),
        }
    }
}

pub async fn run(args: WaitArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let predicate = Predicate::from_args(&args);
    let feedback_port = feedback_port(&args.connection, args.feedback_port);
    let config = args.connection.transport_config(true, feedback_port)?;

    let (tx, mut events) = mpsc::unbounded_channel();
    let store = Arc::new(ReceivedStateStore::new());
    let dispatcher = InboundDispatcher::new(store.clone(), Arc::new(WaitHost { tx }));
    let matcher = FeedbackMatcher::new(store.clone());

    let transport = configure(&config, Arc::new(dispatcher))
        .await
        .map_err(|err| transport_error("wait failed", err))?;
    info!(address = %args.address, ?predicate, "waiting for feedback");

    let outcome = tokio::time::timeout(timeout, async {
        while let Some(event) = events.recv().await {
            match event {
                HostEvent::Check => {
                    // Presence consumes the entry, so snapshot it first.
                    let received = store.get(&args.address);
                    if predicate.holds(&matcher, &args.address) {
                        if let Some(received) = received {
                            let message = OscMessage::with_args(&args.address, received);
                            print_message(&message, None, format);
                        }
                        return Ok(SUCCESS);
                    }
                }
                HostEvent::Status(Status::ConnectionFailure) => {
                    return Err(CliError::new(TRANSPORT_ERROR, "connection failed"));
                }
                HostEvent::Status(Status::Disconnected) => {
                    return Err(CliError::new(
                        TRANSPORT_ERROR,
                        "remote device closed the connection",
                    ));
                }
                HostEvent::Status(_) => {}
            }
        }
        Ok(SUCCESS)
    })
    .await
    .unwrap_or_else(|_| {
        Err(CliError::new(
            TIMEOUT,
            format!("no matching message on {} within {timeout:?}", args.address),
        ))
    });

    if let Err(err) = transport.close().await {
        warn!(%err, "close failed");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use oscwire_frame::OscArg;

    use super::*;
    use crate::cmd::Command;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    fn parse(argv: &[&str]) -> WaitArgs {
        let argv = std::iter::once("oscwire").chain(argv.iter().copied());
        match Harness::try_parse_from(argv).unwrap().command {
            Command::Wait(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn predicate_selection() {
        let args = parse(&["wait", "/ch/1", "-p", "9000", "--args", "1 on"]);
        assert_eq!(
            Predicate::from_args(&args),
            Predicate::Arguments {
                expected: "1 on".into(),
                comparison: Comparison::Equal
            }
        );

        let args = parse(&[
            "wait",
            "/fader",
            "-p",
            "9000",
            "--index",
            "1",
            "--target",
            "0.5",
            "--comparison",
            "greaterthan",
        ]);
        assert_eq!(
            Predicate::from_args(&args),
            Predicate::Indexed {
                index: 1,
                comparison: Comparison::GreaterThan,
                target: "0.5".into()
            }
        );

        let args = parse(&["wait", "/go", "-p", "9000"]);
        assert_eq!(Predicate::from_args(&args), Predicate::Presence);
    }

    #[test]
    fn index_requires_target() {
        let argv = ["oscwire", "wait", "/x", "--index", "0"];
        assert!(Harness::try_parse_from(argv).is_err());
    }

    #[test]
    fn predicates_evaluate_against_store() {
        let store = Arc::new(ReceivedStateStore::new());
        store.update("/fader", vec![OscArg::Int(2), OscArg::Float(0.75)]);
        let matcher = FeedbackMatcher::new(store.clone());

        let indexed = Predicate::Indexed {
            index: 1,
            comparison: Comparison::GreaterThan,
            target: "0.5".into(),
        };
        assert!(indexed.holds(&matcher, "/fader"));
        assert!(Predicate::Presence.holds(&matcher, "/fader"));
        assert!(!indexed.holds(&matcher, "/fader"));
    }
}

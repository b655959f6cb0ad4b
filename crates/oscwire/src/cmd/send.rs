use std::sync::Arc;

use oscwire_args::{MidiFields, SendAction, TokenizeStrategy};
use oscwire_transport::{configure, NoopHandler};
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{args_error, transport_error, CliResult, SUCCESS};

pub async fn run(args: SendArgs) -> CliResult<i32> {
    let message = send_action(&args)
        .build(&args.address)
        .map_err(|err| args_error("invalid arguments", err))?;

    let config = args.connection.transport_config(false, None)?;
    let transport = configure(&config, Arc::new(NoopHandler))
        .await
        .map_err(|err| transport_error("configure failed", err))?;

    let sent = transport.send(&message).await;
    transport
        .close()
        .await
        .map_err(|err| transport_error("close failed", err))?;
    sent.map_err(|err| transport_error("send failed", err))?;

    info!(address = %message.address, tags = %message.type_tags(), "sent");
    Ok(SUCCESS)
}

fn send_action(args: &SendArgs) -> SendAction {
    if let Some(arguments) = &args.args {
        let strategy = if args.verbatim {
            TokenizeStrategy::Verbatim
        } else {
            TokenizeStrategy::Sanitised
        };
        return SendAction::Multiple {
            arguments: arguments.clone(),
            strategy,
        };
    }
    if let Some(value) = &args.int {
        return SendAction::Int {
            value: value.clone(),
        };
    }
    if let Some(value) = &args.float {
        return SendAction::Float {
            value: value.clone(),
        };
    }
    if let Some(value) = &args.string {
        return SendAction::String {
            value: value.clone(),
        };
    }
    if let Some(value) = args.boolean {
        return SendAction::Boolean { value };
    }
    if let Some(hex) = &args.blob {
        return SendAction::Blob { hex: hex.clone() };
    }
    if let Some(mode) = args.midi {
        return SendAction::Midi {
            mode,
            fields: MidiFields {
                port: args.midi_port.clone(),
                channel: args.channel.clone(),
                data1: args.data1.clone(),
                data2: args.data2.clone(),
            },
        };
    }
    if let Some(hex) = &args.midi_raw {
        return SendAction::MidiRaw { hex: hex.clone() };
    }
    SendAction::Blank
}

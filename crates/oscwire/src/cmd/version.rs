use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("oscwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: oscwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("OSCWIRE_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("protocols: udp, tcp, tcp-raw, serial");
    println!("max_buffer_size: {}", oscwire_frame::DEFAULT_MAX_BUFFER);

    Ok(SUCCESS)
}

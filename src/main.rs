use std::io::Read;
use std::time::{Duration, Instant};
use std::{env, error, fs, process};

use emu::gameboy::GameBoy;
use emu::machine::{self, MachineCommand};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    #[cfg(feature = "logger")]
    logger::init_logger(logger::LogKind::STDOUT);

    println!("tangerine v0.1.0");

    let args = env::args().skip(1).collect::<Vec<String>>();
    let Some(name) = args.first() else {
        println!("usage: tangerine <rom> [frame limit]");
        process::exit(1)
    };
    let frame_limit = args.get(1).and_then(|raw| raw.parse::<u64>().ok());

    println!("loading {name}");
    let data = match read_file(name) {
        Ok(data) => data,
        Err(e) => {
            println!("{e}");
            process::exit(2)
        }
    };

    let gb = match GameBoy::new(data) {
        Ok(gb) => gb,
        Err(e) => {
            println!("{e}");
            process::exit(2)
        }
    };
    println!("{}", gb.cartridge());

    let mut handle = machine::spawn(gb);
    handle.send(MachineCommand::Run);

    let mut total_frames: u64 = 0;
    let mut window_frames: u32 = 0;
    let mut window_start = Instant::now();

    loop {
        std::thread::sleep(Duration::from_millis(2));
        handle.poll();

        if handle.frame.take().is_some() {
            total_frames += 1;
            window_frames += 1;
        }

        if window_start.elapsed() >= Duration::from_secs(1) {
            tracing::info!(fps = window_frames, total_frames, pc = handle.state.pc, "running");
            window_frames = 0;
            window_start = Instant::now();
        }

        if frame_limit.is_some_and(|limit| total_frames >= limit) {
            handle.send(MachineCommand::Pause);
            break;
        }
    }

    tracing::info!(total_frames, "done");
}

fn read_file(filepath: &str) -> Result<Vec<u8>, Box<dyn error::Error>> {
    let mut f = fs::File::open(filepath)?;
    let mut buf = vec![];
    f.read_to_end(&mut buf)?;

    Ok(buf)
}

use anyhow::Context;
use dishkit::console::{self, ConsoleCommand, HELP};
use dishkit::{
    init_logging, list_ports, Axis, Config, DishController, DishEvent, Error, SerialOpener,
    BUILD_DATE, VERSION,
};
use dishkit_communication::WorkerEvent;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

enum Input {
    Line(std::io::Result<Option<String>>),
    Worker(Option<WorkerEvent>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    tracing::info!("DishKit {} (built {})", VERSION, BUILD_DATE);

    let opener = SerialOpener::new(
        config.connection.baud_rate,
        config.connection.read_timeout(),
    );
    let mut controller = DishController::new(Arc::new(opener), config.limits.to_limits());
    let mut events = controller.subscribe();

    if config.connection.auto_connect {
        if let Err(err) = controller.connect(&config.connection.port) {
            println!("{}", err);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(&config.console.prompt)?;

    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line),
            event = controller.recv_worker_event() => Input::Worker(event),
        };

        match input {
            Input::Worker(Some(event)) => controller.handle_worker_event(event),
            Input::Worker(None) => break,
            Input::Line(line) => {
                // EOF on stdin behaves like quit
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match console::parse_command(&line) {
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(err) = execute(&mut controller, &config, command) {
                            println!("{}", err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{}", err),
                }
                print_events(&mut events, &controller, config.console.show_reports);
                prompt(&config.console.prompt)?;
                continue;
            }
        }

        print_events(&mut events, &controller, config.console.show_reports);
    }

    controller.shutdown();
    print_events(&mut events, &controller, false);
    Ok(())
}

fn execute(
    controller: &mut DishController,
    config: &Config,
    command: ConsoleCommand,
) -> dishkit::Result<()> {
    match command {
        ConsoleCommand::Connect(port) => {
            controller.connect(port.as_deref().unwrap_or(&config.connection.port))
        }
        ConsoleCommand::Disconnect => controller.disconnect(),
        ConsoleCommand::Goto(az, el) => controller.goto(az, el),
        ConsoleCommand::Advance(az, el) => controller.advance(az, el),
        ConsoleCommand::Velocity(az, el) => controller.set_velocity(az, el),
        ConsoleCommand::Abort => controller.abort(),
        ConsoleCommand::Limits(az, el) => controller.set_overcurrent_limits(az, el),
        ConsoleCommand::Status => {
            let snapshot = serde_json::to_string_pretty(&console::status_json(controller))
                .map_err(|e| Error::other(e.to_string()))?;
            println!("{}", snapshot);
            for axis in Axis::ALL {
                println!(
                    "{}",
                    console::format_motor(axis, &controller.motor(axis), controller.connection_status())
                );
            }
            Ok(())
        }
        ConsoleCommand::Ports => {
            println!("{}", console::format_ports(&list_ports()?));
            Ok(())
        }
        ConsoleCommand::Help => {
            println!("{}", HELP);
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    }
}

fn print_events(
    events: &mut broadcast::Receiver<DishEvent>,
    controller: &DishController,
    show_reports: bool,
) {
    loop {
        match events.try_recv() {
            Ok(event) => {
                if let Some(text) =
                    console::render_event(&event, controller.connection_status(), show_reports)
                {
                    println!("{}", text);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Console skipped {} notifications", skipped);
            }
            Err(_) => break,
        }
    }
}

fn prompt(text: &str) -> anyhow::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}

//! LibreTrip console trip computer
//!
//! Usage: `libretrip [CONFIG] [--record FILE]`
//!
//! Press Enter to cycle display programs, Ctrl-C to quit.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use libretrip_core::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    config: Option<PathBuf>,
    record: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        record: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--record" => {
                let path = it.next().context("--record needs a file path")?;
                args.record = Some(PathBuf::from(path));
            }
            _ => args.config = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "libretrip=info,libretrip_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = parse_args()?;
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => TripConfig::default_path()?,
    };
    let config = TripConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.validate()?;
    tracing::info!("LibreTrip {} using {}", libretrip_core::VERSION, config_path.display());

    let clock = MonotonicClock::new();
    let transport = config.transport.clone();
    if let Some(port) = &transport.port {
        tracing::info!("ELM327 on serial port {port} @ {} baud", transport.baud_rate);
        run(SerialElm327::serial(transport), clock, &config, args).await
    } else if let Some(address) = transport.address.clone() {
        tracing::info!("ELM327 over TCP at {address}");
        run(TcpElm327::tcp(address, transport), clock, &config, args).await
    } else {
        tracing::info!("No adapter configured; running synthetic drive cycle");
        let reader = SyntheticReader::new(clock.clone());
        run(reader, clock, &config, args).await
    }
}

async fn run<R>(reader: R, clock: MonotonicClock, config: &TripConfig, args: Args) -> Result<()>
where
    R: ParameterReader + 'static,
{
    let store = Arc::new(TelemetryStore::with_program(config.program));
    let cancel = CancellationToken::new();

    let acquisition = AcquisitionLoop::new(
        reader,
        clock.clone(),
        store.clone(),
        AcquisitionSettings::from(config),
    )
    .spawn(cancel.clone());

    let mut presenter = Presenter::new(
        store.clone(),
        clock.clone(),
        DisplaySettings::from(config),
        config.snapshot_timeout(),
    );

    let mut recorder = TripRecorder::default();
    if args.record.is_some() {
        recorder.start();
    }

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.render_interval());
    let mut stdin_open = true;
    let mut program = config.program;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    let next = program.next();
                    if presenter.select_program(next).await {
                        program = next;
                    }
                }
                _ => stdin_open = false,
            },
            _ = ticker.tick() => {
                let Some((snapshot, view)) = presenter.frame_with_snapshot().await else {
                    continue;
                };
                program = view.program;
                print!("\r{}\x1b[K", render(&view));
                std::io::stdout().flush()?;
                recorder.record(&snapshot, clock.now_ms());
            }
        }
    }
    println!();

    cancel.cancel();
    let acquisition = acquisition.await.context("acquisition task panicked")?;
    tracing::info!(
        "Stopped after {} reconnection(s); {} frame(s) rendered, {} skipped",
        acquisition.reconnect_policy().reconnections(),
        presenter.rendered_frames(),
        presenter.skipped_frames()
    );

    if let Some(path) = args.record {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        recorder.write_csv(BufWriter::new(file))?;
        tracing::info!("Wrote {} entries to {}", recorder.entry_count(), path.display());
    }

    Ok(())
}

fn render(view: &DashboardView) -> String {
    let link = match view.link {
        LinkStatus::Live => "LIVE ",
        LinkStatus::Stale => "STALE",
        LinkStatus::Down => "DOWN ",
    };

    let body = match view.program {
        SelectedProgram::Basic => format!(
            "{} mpg now | {} mpg avg",
            num(view.instant_economy_mpg, 1),
            num(view.average_economy_mpg, 1)
        ),
        SelectedProgram::Trip => format!(
            "{:.2} km | {:.3} L | {} moving",
            view.distance_km,
            view.fuel_liters,
            hms(view.moving_time.as_secs())
        ),
        SelectedProgram::Stats => format!(
            "{} km/h avg | {} L/100km | tank {}%",
            num(view.average_speed_kph, 1),
            num(view.average_l_per_100km, 1),
            num(view.fuel_level_pct, 0)
        ),
        SelectedProgram::Gauges => format!(
            "{} rpm | load {}% | tank {}%",
            num(view.rpm, 0),
            num(view.engine_load_pct, 0),
            num(view.fuel_level_pct, 0)
        ),
        SelectedProgram::DragTimer => format!("{} km/h", num(view.speed_kph, 0)),
        SelectedProgram::Diagnostics => match view.diagnostic_codes {
            Some(n) => format!("{n} stored code(s)"),
            None => "codes --".to_string(),
        },
    };

    format!(
        "[{link}] {:>11} | {} km/h | {}",
        format!("{:?}", view.program),
        num(view.speed_kph, 0),
        body
    )
}

fn num(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "--".to_string(),
    }
}

fn hms(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

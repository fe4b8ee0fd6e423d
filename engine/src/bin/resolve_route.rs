//! Resolve a list of addresses into places and routes and print the totals.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use clap::{Parser, ValueEnum};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use quickroute_engine::config::EngineSettings;
use quickroute_engine::domain::ports::{
    FixtureGeocodingService, FixtureImportService, FixtureOptimizationService,
    FixtureRoutingService, StateStore,
};
use quickroute_engine::domain::{
    Address, DomainEvent, DriverId, EngineHandle, EngineSnapshot, Objective, OptimizationRequest,
    ResolutionEngine, ResolutionEnginePorts, WaypointEdit, WaypointStatus,
};
use quickroute_engine::outbound::geocoding::NominatimGeocoder;
use quickroute_engine::outbound::quickroute_api::{
    HttpImportService, HttpOptimizationService, QuickRouteApi,
};
use quickroute_engine::outbound::routing::OsrmRouter;
use quickroute_engine::outbound::state_store::JsonFileStateStore;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `resolve-route` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "resolve-route",
    about = "Geocode and route a list of addresses, optionally optimizing the visiting order",
    version
)]
struct CliArgs {
    /// Waypoint addresses in visiting order.
    #[arg(value_name = "address")]
    addresses: Vec<String>,
    /// Read additional addresses from a file, one per line.
    #[arg(long = "waypoints-file", value_name = "path")]
    waypoints_file: Option<PathBuf>,
    /// Replace the waypoints with the stops assigned to this driver.
    #[arg(long = "driver", value_name = "id")]
    driver: Option<String>,
    /// Optimize the visiting order once the waypoints are resolved.
    #[arg(long = "optimize", value_enum, value_name = "objective")]
    optimize: Option<ObjectiveArg>,
    /// Forced first stop for optimization.
    #[arg(long = "start", value_name = "address", requires = "optimize")]
    start: Option<String>,
    /// Forced last stop for optimization.
    #[arg(long = "end", value_name = "address", requires = "optimize")]
    end: Option<String>,
    /// Use deterministic in-process services instead of the network.
    #[arg(long = "offline")]
    offline: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ObjectiveArg {
    Distance,
    Time,
}

impl From<ObjectiveArg> for Objective {
    fn from(value: ObjectiveArg) -> Self {
        match value {
            ObjectiveArg::Distance => Self::Distance,
            ObjectiveArg::Time => Self::Time,
        }
    }
}

fn main() -> io::Result<()> {
    if let Err(e) = fmt().with_env_filter(EnvFilter::from_default_env()).try_init() {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = EngineSettings::load_from_iter([OsString::from("resolve-route")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;

    let mut addresses = parse_addresses(&args.addresses)?;
    if let Some(path) = &args.waypoints_file {
        addresses.extend(Address::parse_lines(&read_text(path)?));
    }

    let ports = if args.offline {
        offline_ports()
    } else {
        network_ports(&settings)?
    };
    let store = match settings.state_dir() {
        Some(dir) => Some(
            JsonFileStateStore::open(dir)
                .map_err(|error| io::Error::other(format!("open state store: {error}")))?,
        ),
        None => None,
    };

    let mut engine = ResolutionEngine::new(ports, Arc::new(DefaultClock));
    if let Some(store) = &store {
        match store.load().await {
            Ok(Some(state)) => {
                info!(waypoints = state.waypoints.len(), "restoring saved state");
                engine = engine.with_state(state);
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "ignoring unreadable saved state"),
        }
    }
    let handle = engine.spawn();

    let result = drive(&handle, &args, addresses).await;
    if let (Ok(()), Some(store)) = (&result, &store) {
        save_state(&handle, store).await?;
    }
    handle.shutdown().await;
    result
}

async fn drive(handle: &EngineHandle, args: &CliArgs, addresses: Vec<Address>) -> io::Result<()> {
    if let Some(driver) = &args.driver {
        handle
            .dispatch(DomainEvent::ImportWaypoints {
                driver_id: DriverId::new(driver.as_str()),
            })
            .await
            .map_err(io::Error::other)?;
        handle.wait_until_settled().await.map_err(io::Error::other)?;
    }
    if !addresses.is_empty() {
        handle
            .edit(WaypointEdit::Replace { addresses })
            .await
            .map_err(io::Error::other)?;
    }
    handle.wait_until_settled().await.map_err(io::Error::other)?;

    if let Some(objective) = args.optimize {
        let mut request = OptimizationRequest::new(objective.into());
        if let Some(start) = optional_address(args.start.as_deref())? {
            request = request.with_start(start);
        }
        if let Some(end) = optional_address(args.end.as_deref())? {
            request = request.with_end(end);
        }
        handle
            .dispatch(DomainEvent::OptimizeRoute(request))
            .await
            .map_err(io::Error::other)?;
        handle.wait_until_settled().await.map_err(io::Error::other)?;
    }

    let snapshot = handle.snapshot().await.map_err(io::Error::other)?;
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &EngineSnapshot) {
    for (index, (waypoint, status)) in snapshot
        .waypoints
        .iter()
        .zip(&snapshot.waypoint_statuses)
        .enumerate()
    {
        let label = match status {
            WaypointStatus::Pending => "pending".to_owned(),
            WaypointStatus::Fetching => "fetching".to_owned(),
            WaypointStatus::Fetched => "ok".to_owned(),
            WaypointStatus::Failed(failure) => format!("failed ({failure})"),
        };
        println!("{:>3}. {} [{label}]", index + 1, waypoint.address());
    }
    if let Some(optimization) = &snapshot.status.optimization {
        println!("optimization={}", to_json(optimization));
    }
    for (driver, import) in &snapshot.status.imports {
        println!("import[{driver}]={}", to_json(import));
    }
    println!("route={}", to_json(&snapshot.route_information()));
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|error| format!("<unserialisable: {error}>"))
}

async fn save_state(handle: &EngineHandle, store: &JsonFileStateStore) -> io::Result<()> {
    let state = handle.persisted_state().await.map_err(io::Error::other)?;
    store
        .save(&state)
        .await
        .map_err(|error| io::Error::other(format!("save state: {error}")))
}

fn offline_ports() -> ResolutionEnginePorts {
    ResolutionEnginePorts::new(
        Arc::new(FixtureGeocodingService),
        Arc::new(FixtureRoutingService),
        Arc::new(FixtureOptimizationService),
        Arc::new(FixtureImportService),
    )
}

fn network_ports(settings: &EngineSettings) -> io::Result<ResolutionEnginePorts> {
    let timeout = settings.request_timeout().map_err(io::Error::other)?;
    let user_agent = settings.user_agent();

    let geocoder_url = settings.geocoder_url().map_err(io::Error::other)?;
    let geocoder = NominatimGeocoder::new(&geocoder_url, timeout, user_agent)
        .map_err(|error| io::Error::other(format!("build geocoder: {error}")))?;
    let router = OsrmRouter::new(
        settings.router_url().map_err(io::Error::other)?,
        timeout,
        user_agent,
    )
    .map_err(|error| io::Error::other(format!("build router: {error}")))?;
    let api = QuickRouteApi::new(
        settings.api_prefix().map_err(io::Error::other)?,
        timeout,
        user_agent,
    )
    .map_err(|error| io::Error::other(format!("build API client: {error}")))?;

    Ok(ResolutionEnginePorts::new(
        Arc::new(geocoder),
        Arc::new(router),
        Arc::new(HttpOptimizationService::new(api.clone())),
        Arc::new(HttpImportService::new(api)),
    ))
}

fn parse_addresses(raw: &[String]) -> io::Result<Vec<Address>> {
    raw.iter()
        .map(|text| {
            Address::new(text).map_err(|error| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("address {text:?}: {error}"))
            })
        })
        .collect()
}

fn optional_address(raw: Option<&str>) -> io::Result<Option<Address>> {
    raw.map(|text| {
        Address::new(text).map_err(|error| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("address {text:?}: {error}"))
        })
    })
    .transpose()
}

fn read_text(path: &Path) -> io::Result<String> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "waypoints path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|error| {
        io::Error::other(format!("open directory '{}': {error}", parent.display()))
    })?;
    directory
        .read_to_string(Path::new(file_name))
        .map_err(|error| io::Error::other(format!("read '{}': {error}", path.display())))
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI parsing helpers.

    use std::io::Write;

    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    #[rstest]
    fn optimization_flags_parse() {
        let args = CliArgs::try_parse_from([
            "resolve-route",
            "--optimize",
            "time",
            "--start",
            "Depot 1",
            "A",
            "B",
        ])
        .expect("arguments should parse");
        assert!(matches!(args.optimize, Some(ObjectiveArg::Time)));
        assert_eq!(args.start.as_deref(), Some("Depot 1"));
        assert_eq!(args.addresses, vec!["A".to_owned(), "B".to_owned()]);
    }

    #[rstest]
    fn start_without_optimize_is_rejected() {
        assert!(CliArgs::try_parse_from(["resolve-route", "--start", "Depot"]).is_err());
    }

    #[rstest]
    fn blank_address_is_invalid_input() {
        let error = parse_addresses(&["A".to_owned(), "  ".to_owned()]).expect_err("blank");
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }

    #[rstest]
    fn waypoints_file_is_read_line_by_line() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "Main Street 1\n\nHarbour Road 7").expect("write temp file");

        let text = read_text(file.path()).expect("read temp file");
        assert_eq!(
            Address::parse_lines(&text),
            vec![
                Address::new("Main Street 1").expect("valid"),
                Address::new("Harbour Road 7").expect("valid"),
            ]
        );
    }
}

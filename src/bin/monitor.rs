//! imu-monitor - host-side receiver for imu-streamer.
//!
//! Scans for devices advertising the IMU service (or named like the
//! firmware), subscribes to the data characteristic and prints every
//! sample. Works with all firmware revisions: whole JSON, chunked JSON and
//! CSV.
//!
//! Usage: `imu-monitor [OUTPUT.csv]`. With a path, every decoded sample is
//! also appended to that file as `timestamp,ax,ay,az,gx,gy,gz`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use uuid::Uuid;

use imu_streamer::config::{
    DEVICE_NAME, HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID, IMU_DATA_CHAR_UUID,
    IMU_SERVICE_UUID, REASSEMBLY_CAPACITY, REASSEMBLY_SLOTS,
};
use imu_streamer::encode::decode_json;
use imu_streamer::receive::{classify_frame, Frame, Reassembler};

const SCAN_WINDOW: Duration = Duration::from_secs(5);

/// Longest `timestamp,ax,..,gz` line.
const ROW_CAPACITY: usize = 160;

#[tokio::main]
async fn main() -> Result<()> {
    let output = std::env::args_os().nth(1).map(PathBuf::from);
    let mut recorder = Recorder::open(output)?;

    let manager = Manager::new().await?;
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;

    let peripheral = find_streamer(&adapter).await?;
    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }
    peripheral.discover_services().await?;

    let imu_char = imu_characteristic(&peripheral)?
        .ok_or_else(|| anyhow!("Device has no IMU data characteristic"))?;

    let mut notifications = peripheral.notifications().await?;
    peripheral.subscribe(&imu_char).await?;
    println!("Subscribed to {}. Listening...", imu_char.uuid);

    let mut reassembler: Reassembler<REASSEMBLY_CAPACITY, REASSEMBLY_SLOTS> = Reassembler::new();
    while let Some(data) = notifications.next().await {
        if data.uuid != imu_char.uuid {
            continue;
        }
        match classify_frame(&data.value) {
            Some(Frame::Chunk(chunk)) => match reassembler.push(chunk) {
                Ok(Some(message)) => match decode_json(&message) {
                    Some(sample) => recorder.record(&Frame::Json(sample))?,
                    None => eprintln!("Unparseable message {}: {}", chunk.id, message),
                },
                Ok(None) => {}
                Err(e) => eprintln!("Chunk {} discarded: {:?}", chunk.id, e),
            },
            Some(frame) => recorder.record(&frame)?,
            None => eprintln!("Unrecognised notification: {}", String::from_utf8_lossy(&data.value)),
        }
    }

    println!(
        "Notification stream closed ({} incomplete messages dropped)",
        reassembler.dropped()
    );
    Ok(())
}

/// Prints samples and optionally appends them to a CSV file.
struct Recorder {
    file: Option<File>,
}

impl Recorder {
    fn open(path: Option<PathBuf>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("cannot open {}", path.display()))?;
                println!("Appending samples to {}", path.display());
                Some(file)
            }
            None => None,
        };
        Ok(Self { file })
    }

    fn record(&mut self, frame: &Frame<'_>) -> Result<()> {
        let (stamp, a, g) = match frame {
            Frame::Json(s) => (s.timestamp_ms.to_string(), s.acceleration, s.angular_velocity),
            Frame::Csv(a, g) => ("-".to_string(), *a, *g),
            Frame::Chunk(_) => return Ok(()),
        };
        println!(
            "{:>10} ms  acc [{:7.3} {:7.3} {:7.3}] g  gyr [{:9.3} {:9.3} {:9.3}] dps",
            stamp, a.x, a.y, a.z, g.x, g.y, g.z
        );

        if let (Some(file), Some(row)) = (self.file.as_mut(), frame.csv_row::<ROW_CAPACITY>()) {
            let row = row.map_err(|e| anyhow!("sample does not fit a CSV row: {:?}", e))?;
            writeln!(file, "{}", row)?;
        }
        Ok(())
    }
}

/// Scan, keep devices that look like the firmware, pick one.
async fn find_streamer(adapter: &Adapter) -> Result<Peripheral> {
    let services = [
        Uuid::parse_str(IMU_SERVICE_UUID)?,
        Uuid::parse_str(HEART_RATE_SERVICE_UUID)?,
    ];

    println!("Scanning for {} ({}s)...", DEVICE_NAME, SCAN_WINDOW.as_secs());
    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(SCAN_WINDOW).await;
    adapter.stop_scan().await?;

    let mut candidates = Vec::new();
    for peripheral in adapter.peripherals().await? {
        let Ok(Some(props)) = peripheral.properties().await else {
            continue;
        };
        let advertises_service = props.services.iter().any(|s| services.contains(s));
        let named_like_us = props.local_name.as_deref() == Some(DEVICE_NAME);
        if advertises_service || named_like_us {
            let label = format!(
                "{} ({}, {} dBm)",
                props.local_name.unwrap_or_else(|| "unnamed".into()),
                props.address,
                props.rssi.map_or_else(|| "?".into(), |r| r.to_string()),
            );
            candidates.push((peripheral, label));
        }
    }

    match candidates.len() {
        0 => Err(anyhow!("No IMU streamer found")),
        1 => {
            let (peripheral, label) = candidates.remove(0);
            println!("Connecting to {}", label);
            Ok(peripheral)
        }
        _ => choose(candidates),
    }
}

fn choose(mut candidates: Vec<(Peripheral, String)>) -> Result<Peripheral> {
    for (i, (_, label)) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, label);
    }
    loop {
        print!("Device (1-{}, q to quit): ", candidates.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(anyhow!("Cancelled"));
        }
        match input.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => {
                let (peripheral, label) = candidates.swap_remove(n - 1);
                println!("Connecting to {}", label);
                return Ok(peripheral);
            }
            _ => println!("Not a device number"),
        }
    }
}

/// The custom IMU characteristic, or the heart-rate one the CSV firmware uses.
fn imu_characteristic(peripheral: &Peripheral) -> Result<Option<Characteristic>> {
    let wanted = [
        Uuid::parse_str(IMU_DATA_CHAR_UUID)?,
        Uuid::parse_str(HEART_RATE_MEASUREMENT_UUID)?,
    ];
    Ok(wanted.iter().find_map(|uuid| {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == *uuid)
    }))
}

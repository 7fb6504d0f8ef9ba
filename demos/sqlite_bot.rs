//! Answer chat commands from a SQLite track store.
//!
//! Run with: cargo run --example sqlite_bot --features persistence [db_path]
//!
//! Without a path an in-memory store is seeded with a sample track.

use chrono::{Duration, TimeZone, Utc};
use stroll_tracker::{
    chat::ChatEventType, ChatEvent, DeviceId, SqliteTrackStore, StrollBot, StrollConfig,
    TrackPoint,
};

const IMEI: &str = "356938035643809";

fn main() -> stroll_tracker::Result<()> {
    env_logger::init();

    let store = match std::env::args().nth(1) {
        Some(path) => SqliteTrackStore::open(&path)?,
        None => {
            let mut store = SqliteTrackStore::in_memory()?;
            let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
            let device = DeviceId::parse(IMEI)?;
            let points: Vec<TrackPoint> = [0, 5, 10, 50, 55, 120, 121, 122]
                .iter()
                .enumerate()
                .map(|(i, &m)| TrackPoint::new(start + Duration::minutes(m), 0.0, i as f64 * 0.001))
                .collect();
            store.insert_points(&device, &points)?;
            store
        }
    };

    let bot = StrollBot::new(store, StrollConfig::default());

    for text in [IMEI.to_string(), format!("/top {}", IMEI), "not-an-imei".to_string()] {
        let event: ChatEvent = serde_json::from_value(serde_json::json!({
            "event": "message",
            "sender": { "id": "demo-user", "name": "Demo" },
            "message": { "type": "text", "text": text }
        }))
        .expect("static event is valid");
        assert_eq!(event.event, ChatEventType::Message);

        println!("> {}", text);
        match bot.handle(&event)? {
            Some(reply) => println!("{}\n", reply.message().text),
            None => println!("(no reply)\n"),
        }
    }

    Ok(())
}

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scope_mount::{Direction, GotoRequest, Mount, MockMount, MountConfig, RealMount, SlewRequest, WorkMode};
use synscan::channel::Transport;
use synscan::{MountClient, SynScanError, WatchdogConfig};

type Log = Arc<Mutex<Vec<Vec<u8>>>>;

struct Bench(Log);

impl Transport for Bench {
    fn transmit(&mut self, frame: &[u8]) -> synscan::Result<Vec<u8>> {
        self.0.lock().unwrap().push(frame.to_vec());
        Ok(match frame {
            b"e" => b"40000000,20000000".to_vec(),
            _ => Vec::new(),
        })
    }
}

fn bench_mount() -> (RealMount, Log) {
    let log = Log::default();
    let client = MountClient::with_transport(
        Box::new(Bench(log.clone())),
        "bench",
        Duration::from_millis(1),
        &WatchdogConfig { enable: false, ..WatchdogConfig::default() },
        Arc::new(|_: &SynScanError| {}),
    )
    .unwrap();
    (RealMount::from_client(client, MountConfig::default().slew_speeds), log)
}

#[test]
fn requests_parse_from_json() {
    let slew: SlewRequest = serde_json::from_str(r#"{"direction": "RA", "speed": -7}"#).unwrap();
    assert_eq!(slew, SlewRequest { direction: Direction::Ra, speed: -7 });
    let slew: SlewRequest = serde_json::from_str(r#"{"direction": "Dec", "speed": 2}"#).unwrap();
    assert_eq!(slew.direction, Direction::Dec);

    let goto: GotoRequest = serde_json::from_str(r#"{"ra": "5h 35m 17s", "dec": "22° 0’ 52”"}"#).unwrap();
    assert_eq!(goto.ra, "5h 35m 17s");
}

#[test]
fn only_configured_speeds_are_allowed() {
    let allowed = MountConfig::default().slew_speeds;
    for speed in [-7, -2, 2, 7] {
        SlewRequest { direction: Direction::Ra, speed }.validate(&allowed).unwrap();
    }
    for speed in [-5, 0, 1, 9] {
        assert!(SlewRequest { direction: Direction::Dec, speed }.validate(&allowed).is_err());
    }
}

#[test]
fn real_mount_sends_validated_slews_only() {
    let (mount, log) = bench_mount();
    mount.start_slew(&SlewRequest { direction: Direction::Dec, speed: -2 }).unwrap();
    assert!(mount.start_slew(&SlewRequest { direction: Direction::Dec, speed: 5 }).is_err());
    mount.stop_slew().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            vec![b'P', 2, 0x11, b'%', 2, 0, 0, 0],
            vec![b'P', 2, 0x10, b'$', 0, 0, 0, 0],
            vec![b'P', 2, 0x11, b'$', 0, 0, 0, 0],
        ]
    );
}

#[test]
fn real_mount_goto_and_position_use_display_strings() {
    let (mount, log) = bench_mount();
    assert_eq!(mount.get_coordinates().unwrap(), ("6h 0m 0s".to_string(), "45° 0’ 0”".to_string()));

    mount
        .goto_coordinates(&GotoRequest { ra: "6h 0m 0s".into(), dec: "45° 0’ 0”".into() })
        .unwrap();
    assert_eq!(log.lock().unwrap().last().unwrap(), b"r40000000,20000000");

    let err = mount
        .goto_coordinates(&GotoRequest { ra: "six".into(), dec: "45".into() })
        .unwrap_err();
    assert!(err.to_string().contains("goto six 45"));
}

#[test]
fn mock_mount_validates_like_real_one() {
    let mock = MockMount::new(MountConfig::default().slew_speeds);
    mock.start_slew(&SlewRequest { direction: Direction::Ra, speed: 7 }).unwrap();
    assert!(mock.start_slew(&SlewRequest { direction: Direction::Ra, speed: 3 }).is_err());
    assert!(mock.goto_coordinates(&GotoRequest { ra: "1h".into(), dec: "2° 3’ 4”".into() }).is_err());
    mock.goto_coordinates(&GotoRequest { ra: "1h 2m 3s".into(), dec: "2° 3’ 4”".into() }).unwrap();
    mock.stop_slew().unwrap();

    let (ra, dec) = mock.get_coordinates().unwrap();
    assert!(ra.ends_with('s'));
    assert!(dec.ends_with('”'));
}

#[test]
fn workmode_from_config_text() {
    let cfg: MountConfig = config_with_mode("mock");
    assert_eq!(cfg.workmode, WorkMode::Mock);
    assert_eq!(cfg.slew_speeds, vec![-7, -2, 2, 7]);
}

fn config_with_mode(mode: &str) -> MountConfig {
    serde_json::from_str(&format!(r#"{{"workmode": "{}"}}"#, mode)).unwrap()
}

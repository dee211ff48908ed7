//! Drive the navigation core through a short field pass, as the executable does.

use std::time::Duration;

use nav_if::cmd::{JoinStyle, NavCmd};
use nav_lib::{
    coverage::{section_ctrl, SectionCtrlParams},
    data_store::DataStore,
    guidance::{self, GuidanceParams},
    headland::{FieldMgr, HeadlandParams},
    loc::{LocParams, LocalPlane, PoseStore, Wgs84Origin},
    replay::ReplayLog,
    sentence::{self, MS_PER_KNOT},
    track::TrackParams,
};
use util::module::State;

const ORIGIN: Wgs84Origin = Wgs84Origin {
    latitude_deg: 48.0,
    longitude_deg: 11.5,
};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Format an angle as `[d]ddmm.mmmmmmm` with `deg_digits` degree digits.
fn ddmm(angle_deg: f64, deg_digits: usize) -> String {
    let units = (angle_deg.abs() * 60.0 * 1e7).round() as u64;
    let per_deg = 60 * 10_000_000;

    format!(
        "{:0w$}{:02}.{:07}",
        units / per_deg,
        (units % per_deg) / 10_000_000,
        units % 10_000_000,
        w = deg_digits
    )
}

/// Build a `$PANDA` sentence for a position in the local plane.
fn panda(tick: usize, easting_m: f64, northing_m: f64, heading_deg: f64, speed_ms: f64) -> Vec<u8> {
    let plane = LocalPlane::new(ORIGIN.latitude_deg, ORIGIN.longitude_deg);
    let (lat, lon) = plane.to_wgs84(easting_m, northing_m);

    let body = format!(
        "PANDA,12{:02}{:02},{},N,{},E,4,12,0.8,100.0,1.0,{:.4},{:.2},0.0,0.0,0.0",
        tick / 60,
        tick % 60,
        ddmm(lat, 2),
        ddmm(lon, 3),
        speed_ms / MS_PER_KNOT,
        heading_deg,
    );

    format!("${}*{:02X}\r\n", body, sentence::checksum(body.as_bytes())).into_bytes()
}

fn apply(field_mgr: &mut FieldMgr, cmd: NavCmd) {
    let version = field_mgr.apply(&cmd).unwrap().unwrap();
    assert!(field_mgr.wait_for(version, TIMEOUT).unwrap());
}

/// Run one tick as the executable does.
fn tick(ds: &mut DataStore, field_mgr: &mut FieldMgr, sentence: &[u8]) {
    ds.tick_start();
    ds.ingest_bytes(sentence);
    assert_eq!(ds.num_sentences, 1);

    field_mgr.poll().unwrap();
    let snapshot = field_mgr.snapshot().unwrap();

    let pose = ds.pose_store.pose().copied();
    let speed_ms = ds.pose_store.speed_ms();

    ds.guidance_input = guidance::InputData {
        pose,
        speed_ms,
        track: snapshot.track.clone(),
    };
    let (o, r) = ds.guidance.proc(&ds.guidance_input).unwrap();
    ds.guidance_output = o;
    ds.guidance_status_rpt = r;

    ds.section_ctrl_input = section_ctrl::InputData {
        pose,
        speed_ms,
        snapshot,
        reset_applied: std::mem::take(&mut ds.reset_applied),
    };
    let (o, r) = ds.section_ctrl.proc(&ds.section_ctrl_input).unwrap();
    ds.section_ctrl_output = o;
    ds.section_ctrl_status_rpt = r;

    ds.tick_end();
}

#[test]
fn test_field_pass() {
    let mut field_mgr = FieldMgr::new(HeadlandParams::default(), TrackParams::default()).unwrap();

    let mut ds = DataStore {
        pose_store: PoseStore::new(&LocParams { origin: Some(ORIGIN) }),
        ..Default::default()
    };
    ds.guidance.init(GuidanceParams::default(), None).unwrap();
    ds.section_ctrl.init(SectionCtrlParams::default(), None).unwrap();

    apply(
        &mut field_mgr,
        NavCmd::SetBoundary {
            outer: vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]],
            islands: vec![],
        },
    );
    apply(
        &mut field_mgr,
        NavCmd::SetHeadland {
            pass_width_m: 10.0,
            num_passes: 1,
            join: JoinStyle::Round,
        },
    );
    apply(
        &mut field_mgr,
        NavCmd::SetLine {
            a: [50.0, 0.0],
            b: [50.0, 100.0],
        },
    );

    let snapshot = field_mgr.snapshot().unwrap();
    assert_eq!(snapshot.headland_rings.len(), 1);
    assert!(snapshot.track.is_some());

    // ---- Northbound pass 1 m right of the line ----

    let mut t = 0;
    for northing_m in 20..=70 {
        tick(&mut ds, &mut field_mgr, &panda(t, 51.0, northing_m as f64, 0.0, 1.0));
        t += 1;

        let steer = ds.guidance_output.unwrap();
        assert!((steer.xte_m - 1.0).abs() < 1e-2);
        assert!(steer.steer_angle_rad < 0.0);
        assert!(steer.same_direction);

        assert!(ds.section_ctrl_output.section_on.iter().all(|&on| on));
        assert!(!ds.section_ctrl_output.headland.is_tool_outer_points_in_headland);
    }

    // Three 2 m sections over 50 m
    let area_m2 = ds.section_ctrl.applied().gross_area_m2();
    assert!((area_m2 - 300.0).abs() < 1.0, "applied area {}", area_m2);

    // ---- Southbound over the worked strip ----

    // Quarter metre offset keeps the tool edges off the strip joins
    for northing_m in (40..=60).rev() {
        tick(&mut ds, &mut field_mgr, &panda(t, 51.0, northing_m as f64 + 0.25, 180.0, 1.0));
        t += 1;

        assert!(!ds.guidance_output.unwrap().same_direction);
        assert!(ds.section_ctrl_output.section_on.iter().all(|&on| !on));
        assert!(ds.section_ctrl_output.tool_coverage.is_fully_covered);
    }

    assert!((ds.section_ctrl.applied().gross_area_m2() - area_m2).abs() < 1e-9);

    // ---- Nudge the line onto the vehicle ----

    apply(&mut field_mgr, NavCmd::NudgeTrack { offset_m: 1.0 });
    tick(&mut ds, &mut field_mgr, &panda(t, 51.0, 50.0, 0.0, 1.0));

    assert!(ds.guidance_output.unwrap().xte_m.abs() < 1e-2);
    assert_eq!(ds.pose_store.stats().num_fixes, t as u64 + 1);
}

#[test]
fn test_reset_applied_and_bad_sentences() {
    let mut field_mgr = FieldMgr::new(HeadlandParams::default(), TrackParams::default()).unwrap();

    let mut ds = DataStore {
        pose_store: PoseStore::new(&LocParams { origin: Some(ORIGIN) }),
        ..Default::default()
    };
    ds.guidance.init(GuidanceParams::default(), None).unwrap();
    ds.section_ctrl.init(SectionCtrlParams::default(), None).unwrap();

    // No boundary, sections work everywhere
    for (t, northing_m) in (0..5).enumerate() {
        tick(&mut ds, &mut field_mgr, &panda(t, 0.0, northing_m as f64, 0.0, 1.0));
    }
    assert_eq!(ds.section_ctrl.applied().len(), 12);
    assert!(ds.guidance_output.is_none());

    // A corrupted sentence keeps the last pose
    let before = *ds.pose_store.pose().unwrap();
    let mut corrupt = panda(5, 0.0, 10.0, 0.0, 1.0);
    corrupt[10] = b'9';
    ds.tick_start();
    ds.ingest_bytes(&corrupt);
    assert_eq!(*ds.pose_store.pose().unwrap(), before);
    assert_eq!(ds.pose_store.stats().num_checksum_errors, 1);

    // Reset is not a field edit, the driver flags it for section control
    assert_eq!(field_mgr.apply(&NavCmd::ResetApplied).unwrap(), None);
    ds.reset_applied = true;
    tick(&mut ds, &mut field_mgr, &panda(6, 0.0, 5.0, 0.0, 1.0));

    assert!(ds.section_ctrl.applied().is_empty());
    assert!(!ds.reset_applied);
}

#[test]
fn test_demo_log() {
    let mut replay = ReplayLog::from_contents(include_str!("../../demos/field_pass.log")).unwrap();
    assert_eq!(replay.num_ticks(), 164);
    assert!(replay.trailing_cmds().is_empty());

    let mut ds = DataStore {
        pose_store: PoseStore::new(&LocParams { origin: Some(ORIGIN) }),
        ..Default::default()
    };

    let mut num_cmds = 0;
    while let Some(tick) = replay.next_tick() {
        num_cmds += tick.cmds.len();
        ds.ingest_bytes(&tick.sentence);
    }

    assert_eq!(num_cmds, 5);
    assert_eq!(ds.pose_store.stats().num_fixes, 164);
    assert_eq!(ds.pose_store.stats().num_errors(), 0);

    let pose = ds.pose_store.pose().unwrap();
    assert!((pose.easting_m - 56.0).abs() < 1e-2);
    assert!((pose.northing_m - 12.0).abs() < 1e-2);
}

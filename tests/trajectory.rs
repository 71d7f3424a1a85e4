mod common;

use std::sync::atomic::Ordering::Relaxed;

use approx::assert_relative_eq;
use common::{Call, MockLink};
use crazyflie_mocap::trajectory::{
    figure8, parse_trajectory, slalom, total_duration, upload_trajectory, validate_trajectory, wave,
    TrajectorySegment, FIGURE8, MAX_PIECES,
};
use crazyflie_mocap::Error;

fn row(duration: f32) -> Vec<f32> {
    let mut row = vec![0.0; 33];
    row[0] = duration;
    row
}

#[test]
fn segment_from_row_splits_coefficients() {
    let values: Vec<f32> = (0..33).map(|v| v as f32).collect();
    let segment = TrajectorySegment::from_row(&values).unwrap();

    assert_eq!(segment.duration, 0.0);
    assert_eq!(segment.x, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(segment.y[0], 9.0);
    assert_eq!(segment.z[0], 17.0);
    assert_eq!(segment.yaw, [25.0, 26.0, 27.0, 28.0, 29.0, 30.0, 31.0, 32.0]);
}

#[test]
fn segment_from_row_needs_33_values() {
    assert!(matches!(
        TrajectorySegment::from_row(&[1.0; 32]),
        Err(Error::TrajectoryError(_))
    ));
    assert!(matches!(
        TrajectorySegment::from_row(&[1.0; 34]),
        Err(Error::TrajectoryError(_))
    ));
}

#[test]
fn evaluate_polynomial() {
    let mut values = row(1.0);
    // x = 1 + 2t, z = 0.5 t^2
    values[1] = 1.0;
    values[2] = 2.0;
    values[19] = 0.5;
    let segment = TrajectorySegment::from_row(&values).unwrap();

    assert_eq!(segment.evaluate(0.0), [1.0, 0.0, 0.0, 0.0]);
    assert_eq!(segment.evaluate(2.0), [5.0, 0.0, 2.0, 0.0]);
}

#[test]
fn figure8_table() {
    let segments = figure8();
    assert_eq!(segments.len(), FIGURE8.len());
    assert_eq!(segments.len(), 10);
    assert_relative_eq!(total_duration(&segments), 7.283185, epsilon = 1e-5);

    // Starts and ends at the origin
    assert_eq!(segments[0].evaluate(0.0), [0.0, 0.0, 0.0, 0.0]);
    let last = segments[9];
    let [x, y, _, _] = last.evaluate(last.duration);
    assert!(x.abs() < 0.01 && y.abs() < 0.01);
}

#[test]
fn generated_tables() {
    let slalom = slalom().unwrap();
    assert_eq!(slalom.len(), 13);
    // Scientific notation is parsed, not dropped
    assert_relative_eq!(slalom[6].x[7], -5.4623e-14);
    assert_relative_eq!(slalom[1].x[0], 0.0);
    assert_relative_eq!(slalom[1].y[0], 0.7);

    let wave = wave().unwrap();
    assert_eq!(wave.len(), 36);
    assert_relative_eq!(wave[9].x[2], 1.2986e-5);
}

#[test]
fn parse_accepts_commas_comments_and_blank_lines() {
    let text = "# duration, x, y, z, yaw\n\n1.5, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0\n\t2.5 1E-3 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n";
    let segments = parse_trajectory(text).unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].duration, 1.5);
    assert_relative_eq!(segments[1].x[0], 0.001);
    assert_relative_eq!(total_duration(&segments), 4.0);
}

#[test]
fn parse_errors_name_the_line() {
    let short = "1 2 3\n";
    match parse_trajectory(short) {
        Err(Error::TrajectoryError(reason)) => assert!(reason.contains("line 1")),
        other => panic!("unexpected result {:?}", other),
    }

    let text = format!("{}\n1.0 abc{}\n", "1.0 0".to_owned() + &" 0".repeat(31), " 0".repeat(31));
    match parse_trajectory(&text) {
        Err(Error::TrajectoryError(reason)) => assert!(reason.contains("line 2")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn validation() {
    let ok = [TrajectorySegment::from_row(&row(1.0)).unwrap()];
    assert!(validate_trajectory(&ok).is_ok());

    assert!(matches!(validate_trajectory(&[]), Err(Error::TrajectoryError(_))));

    let zero = [TrajectorySegment::from_row(&row(0.0)).unwrap()];
    assert!(matches!(validate_trajectory(&zero), Err(Error::TrajectoryError(_))));

    let mut nan = ok;
    nan[0].z[3] = f32::NAN;
    assert!(matches!(validate_trajectory(&nan), Err(Error::TrajectoryError(_))));

    let too_many = vec![ok[0]; MAX_PIECES + 1];
    assert!(matches!(validate_trajectory(&too_many), Err(Error::TrajectoryError(_))));

    // 31 pieces fit in 4096 bytes, 32 do not
    assert!(validate_trajectory(&vec![ok[0]; 31]).is_ok());
    assert!(matches!(validate_trajectory(&vec![ok[0]; 32]), Err(Error::TrajectoryError(_))));
}

#[tokio::test]
async fn upload_writes_and_defines() {
    let link = MockLink::new();

    let duration = upload_trajectory(&link, 1, &figure8()).await.unwrap();

    assert_relative_eq!(duration, 7.283185, epsilon = 1e-5);
    assert_eq!(
        link.calls(),
        vec![Call::WriteTrajectory(10), Call::DefineTrajectory(1, 0, 10)]
    );
}

#[tokio::test]
async fn upload_of_too_large_trajectory_sends_nothing() {
    let link = MockLink::new();

    let result = upload_trajectory(&link, 1, &wave().unwrap()).await;

    assert!(matches!(result, Err(Error::TrajectoryError(_))));
    assert!(link.calls().is_empty());
}

#[tokio::test]
async fn upload_of_part_of_a_table() {
    let link = MockLink::new();
    let wave = wave().unwrap();

    let duration = upload_trajectory(&link, 3, &wave[..18]).await.unwrap();

    assert_relative_eq!(duration, total_duration(&wave[..18]));
    assert_eq!(link.calls()[1], Call::DefineTrajectory(3, 0, 18));
}

#[tokio::test]
async fn short_write_is_an_error() {
    let link = MockLink::new();
    link.short_write.store(true, Relaxed);

    let result = upload_trajectory(&link, 1, &figure8()).await;

    assert!(matches!(result, Err(Error::MemoryError(_))));
    assert_eq!(link.calls(), vec![Call::WriteTrajectory(10)]);
}

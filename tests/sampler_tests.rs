mod common;

use common::RecordingUploader;
use mcart::application::sampler::{
    SamplerConfig, SamplerPhase, SamplerStatus, SensorSampler, SensorSet,
};
use mcart::domain::lifecycle::{LifecycleSignal, LifecycleState};
use mcart::domain::lifecycle::LifecycleState::{Active, Background};
use mcart::domain::sensor::{Axes, SensorKind, SensorVector, VECTOR_WIDTH};
use mcart::infrastructure::sensors::BroadcastSensor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const CAPACITY: usize = 5;

struct Rig {
    signal: LifecycleSignal,
    sensors: [BroadcastSensor; 3],
    uploader: RecordingUploader,
    status: watch::Receiver<SamplerStatus>,
    latest: watch::Receiver<Option<SensorVector>>,
    runner: JoinHandle<()>,
}

fn rig(initial: LifecycleState, uploader: RecordingUploader) -> Rig {
    let signal = LifecycleSignal::new(initial);
    let sensors = SensorKind::ALL.map(BroadcastSensor::new);
    let [acc, mag, gyr] = sensors.clone();
    let set = SensorSet {
        accelerometer: Arc::new(acc),
        magnetometer: Arc::new(mag),
        gyroscope: Arc::new(gyr),
    };
    let config = SamplerConfig {
        batch_capacity: CAPACITY,
        interval: Duration::from_millis(10),
    };
    let sampler = SensorSampler::new(set, Box::new(uploader.clone()), config);
    let status = sampler.status();
    let latest = sampler.latest_vector();
    let runner = tokio::spawn(sampler.run(signal.subscribe()));
    Rig {
        signal,
        sensors,
        uploader,
        status,
        latest,
        runner,
    }
}

async fn until_subscribed(sensor: &BroadcastSensor) {
    while sensor.subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_batch_holds_exactly_capacity_vectors() {
    let mut rig = rig(Active, RecordingUploader::default());

    rig.status.wait_for(|s| s.flushed >= 1).await.unwrap();

    let uploads = rig.uploader.uploads.lock().clone();
    assert_eq!(uploads[0].len(), CAPACITY * VECTOR_WIDTH);
    // Nothing reported, so every component is zero-filled
    assert!(uploads[0].iter().all(|v| *v == 0.0));
    assert_eq!(rig.sensors[0].update_interval(), Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_vectors_carry_latest_readings_in_order() {
    let mut rig = rig(Active, RecordingUploader::default());
    until_subscribed(&rig.sensors[2]).await;

    rig.sensors[0].emit(Axes::new(1.0, 2.0, 3.0));
    rig.sensors[2].emit(Axes::new(7.0, 8.0, 9.0));
    rig.status.wait_for(|s| s.flushed >= 1).await.unwrap();

    let upload = rig.uploader.uploads.lock()[0].clone();
    for vector in upload.chunks(VECTOR_WIDTH) {
        assert_eq!(vector, &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 7.0, 8.0, 9.0]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_latest_vector_tracks_the_last_tick() {
    let mut rig = rig(Active, RecordingUploader::default());
    until_subscribed(&rig.sensors[2]).await;

    rig.sensors[0].emit(Axes::new(1.0, 2.0, 3.0));
    rig.sensors[2].emit(Axes::new(7.0, 8.0, 9.0));
    rig.status.wait_for(|s| s.collected >= 2).await.unwrap();

    assert_eq!(
        *rig.latest.borrow(),
        Some(SensorVector([1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 7.0, 8.0, 9.0]))
    );

    rig.sensors[1].emit(Axes::new(4.0, 5.0, 6.0));
    let expected = SensorVector([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    tokio::time::timeout(
        Duration::from_secs(1),
        rig.latest.wait_for(|v| *v == Some(expected)),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_background_discards_partial_batch() {
    let mut rig = rig(Active, RecordingUploader::default());
    until_subscribed(&rig.sensors[0]).await;

    rig.sensors[0].emit(Axes::new(5.0, 5.0, 5.0));
    rig.status.wait_for(|s| s.collected >= 2).await.unwrap();

    rig.signal.emit(Background);
    let paused = *rig
        .status
        .wait_for(|s| s.phase == SamplerPhase::Paused)
        .await
        .unwrap();
    assert_eq!(paused.collected, 0);
    assert_eq!(paused.flushed, 0);
    assert!(rig.sensors.iter().all(|s| s.subscriber_count() == 0));

    rig.signal.emit(Active);
    rig.status.wait_for(|s| s.flushed >= 1).await.unwrap();

    let uploads = rig.uploader.uploads.lock().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].len(), CAPACITY * VECTOR_WIDTH);
    // Readings from before the pause are not carried into the new cycle
    assert!(uploads[0].iter().all(|v| *v == 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_still_restarts_collection() {
    let mut rig = rig(Active, RecordingUploader::failing(1));

    let status = *rig.status.wait_for(|s| s.flushed >= 2).await.unwrap();

    assert_eq!(status.failed, 1);
    assert_eq!(rig.uploader.uploads.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_foreground_before_collecting() {
    let mut rig = rig(Background, RecordingUploader::default());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(rig.status.borrow().phase, SamplerPhase::Waiting);
    assert!(rig.uploader.uploads.lock().is_empty());

    rig.signal.emit(Active);
    rig.status.wait_for(|s| s.flushed >= 1).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_signal_stops_sampler() {
    let rig = rig(Active, RecordingUploader::default());
    until_subscribed(&rig.sensors[1]).await;

    drop(rig.signal);
    rig.runner.await.unwrap();

    assert!(rig.sensors.iter().all(|s| s.subscriber_count() == 0));
}

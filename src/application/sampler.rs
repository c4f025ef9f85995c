use crate::domain::lifecycle::{LifecycleSubscription, Transition};
use crate::domain::ports::{BatchUploaderBox, SensorStreamRef};
use crate::domain::sensor::{Axes, LatestReadings, SensorBatch, SensorKind, SensorVector};
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{info, trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Vectors per uploaded batch.
    pub batch_capacity: usize,
    /// Native sensor interval and tick period.
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            batch_capacity: 1000,
            interval: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPhase {
    Waiting,
    Collecting,
    Sent,
    UploadFailed,
    Paused,
}

impl fmt::Display for SamplerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SamplerPhase::Waiting => "Waiting...",
            SamplerPhase::Collecting => "Collecting data...",
            SamplerPhase::Sent => "Data sent to backend",
            SamplerPhase::UploadFailed => "Upload failed",
            SamplerPhase::Paused => "App backgrounded. Data collection stopped.",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerStatus {
    pub phase: SamplerPhase,
    /// Vectors in the batch currently being collected.
    pub collected: usize,
    /// Batches handed to the uploader, successful or not.
    pub flushed: u64,
    pub failed: u64,
}

impl Default for SamplerStatus {
    fn default() -> Self {
        Self {
            phase: SamplerPhase::Waiting,
            collected: 0,
            flushed: 0,
            failed: 0,
        }
    }
}

/// The three motion sensors, in vector order.
#[derive(Clone)]
pub struct SensorSet {
    pub accelerometer: SensorStreamRef,
    pub magnetometer: SensorStreamRef,
    pub gyroscope: SensorStreamRef,
}

impl SensorSet {
    fn each(&self) -> [&SensorStreamRef; 3] {
        [&self.accelerometer, &self.magnetometer, &self.gyroscope]
    }
}

/// Everything one collection cycle owns. Dropping it tears the cycle down:
/// the tick stops and all three subscriptions are released together.
struct CollectionCycle {
    batch: SensorBatch,
    subscriptions: [Option<broadcast::Receiver<Axes>>; 3],
    tick: Interval,
    latest: LatestReadings,
}

impl CollectionCycle {
    fn start(sensors: &SensorSet, config: &SamplerConfig) -> Self {
        let subscriptions = sensors.each().map(|sensor| {
            sensor.set_update_interval(config.interval);
            Some(sensor.subscribe())
        });
        let mut tick = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            batch: SensorBatch::with_capacity(config.batch_capacity),
            subscriptions,
            tick,
            latest: LatestReadings::default(),
        }
    }

    /// Collects until the batch is sealed.
    ///
    /// Cancel safe: progress lives in `self`, so a dropped call loses nothing
    /// and the next call picks up where it left off.
    async fn fill(
        &mut self,
        status: &watch::Sender<SamplerStatus>,
        latest: &watch::Sender<Option<SensorVector>>,
    ) {
        let [acc, mag, gyr] = &mut self.subscriptions;
        loop {
            tokio::select! {
                _ = self.tick.tick() => {
                    let vector = self.latest.assemble();
                    trace!(?vector, "tick");
                    latest.send_replace(Some(vector));
                    let sealed = self.batch.push(vector);
                    let collected = self.batch.len();
                    status.send_modify(|s| s.collected = collected);
                    if sealed {
                        return;
                    }
                }
                reading = next_reading(acc), if acc.is_some() => {
                    record(&mut self.latest, acc, SensorKind::Accelerometer, reading);
                }
                reading = next_reading(mag), if mag.is_some() => {
                    record(&mut self.latest, mag, SensorKind::Magnetometer, reading);
                }
                reading = next_reading(gyr), if gyr.is_some() => {
                    record(&mut self.latest, gyr, SensorKind::Gyroscope, reading);
                }
            }
        }
    }
}

async fn next_reading(subscription: &mut Option<broadcast::Receiver<Axes>>) -> Option<Axes> {
    let receiver = subscription.as_mut()?;
    loop {
        match receiver.recv().await {
            Ok(axes) => return Some(axes),
            // Only the latest value matters.
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}

fn record(
    latest: &mut LatestReadings,
    subscription: &mut Option<broadcast::Receiver<Axes>>,
    kind: SensorKind,
    reading: Option<Axes>,
) {
    match reading {
        Some(axes) => latest.record(kind, axes),
        None => {
            warn!(sensor = %kind, "sensor stream closed, reading zeros");
            *subscription = None;
        }
    }
}

/// Samples the motion sensors at a fixed rate and uploads full batches.
///
/// Collection runs only while the app is active. Leaving the foreground
/// discards the batch in progress; returning starts an empty one. A failed
/// upload is reported through the status channel and the next cycle starts
/// anyway.
pub struct SensorSampler {
    sensors: SensorSet,
    uploader: BatchUploaderBox,
    config: SamplerConfig,
    cycle: Option<CollectionCycle>,
    status: watch::Sender<SamplerStatus>,
    latest: watch::Sender<Option<SensorVector>>,
}

impl SensorSampler {
    pub fn new(sensors: SensorSet, uploader: BatchUploaderBox, config: SamplerConfig) -> Self {
        let (status, _) = watch::channel(SamplerStatus::default());
        let (latest, _) = watch::channel(None);
        Self {
            sensors,
            uploader,
            config,
            cycle: None,
            status,
            latest,
        }
    }

    pub fn status(&self) -> watch::Receiver<SamplerStatus> {
        self.status.subscribe()
    }

    /// Most recently assembled vector, for display.
    pub fn latest_vector(&self) -> watch::Receiver<Option<SensorVector>> {
        self.latest.subscribe()
    }

    /// Runs until every lifecycle signal handle is dropped.
    pub async fn run(mut self, mut lifecycle: LifecycleSubscription) {
        if lifecycle.current().is_active() {
            self.start_cycle();
        }

        loop {
            if self.cycle.is_none() {
                match lifecycle.next().await {
                    Some(transition) => self.on_transition(transition),
                    None => break,
                }
                continue;
            }
            let Some(cycle) = self.cycle.as_mut() else {
                continue;
            };

            tokio::select! {
                biased;
                transition = lifecycle.next() => match transition {
                    Some(transition) => self.on_transition(transition),
                    None => break,
                },
                _ = cycle.fill(&self.status, &self.latest) => {
                    // Tick and subscriptions go in the same step the batch is sealed.
                    if let Some(full) = self.cycle.take() {
                        self.flush(full.batch).await;
                    }
                    self.start_cycle();
                }
            }
        }

        self.stop_cycle();
        info!("sensor sampler stopped");
    }

    fn on_transition(&mut self, transition: Transition) {
        if !transition.next.is_active() {
            if self.stop_cycle() {
                self.status.send_modify(|s| {
                    s.phase = SamplerPhase::Paused;
                    s.collected = 0;
                });
            }
        } else if transition.is_resume() {
            self.start_cycle();
        }
    }

    fn start_cycle(&mut self) {
        self.cycle = Some(CollectionCycle::start(&self.sensors, &self.config));
        self.status.send_modify(|s| {
            s.phase = SamplerPhase::Collecting;
            s.collected = 0;
        });
        trace!(capacity = self.config.batch_capacity, "collection cycle started");
    }

    /// Drops the current cycle, if any. Returns whether one was running.
    fn stop_cycle(&mut self) -> bool {
        match self.cycle.take() {
            Some(cycle) => {
                info!(discarded = cycle.batch.len(), "collection stopped");
                true
            }
            None => false,
        }
    }

    async fn flush(&mut self, batch: SensorBatch) {
        let vectors = batch.len();
        match self.uploader.upload(batch.into_flat()).await {
            Ok(()) => {
                info!(vectors, "sensor batch uploaded");
                self.status.send_modify(|s| {
                    s.phase = SamplerPhase::Sent;
                    s.flushed += 1;
                });
            }
            Err(e) => {
                warn!(vectors, "sensor batch upload failed: {e}");
                self.status.send_modify(|s| {
                    s.phase = SamplerPhase::UploadFailed;
                    s.flushed += 1;
                    s.failed += 1;
                });
            }
        }
    }
}

use crate::domain::ports::SensorStream;
use crate::domain::sensor::{Axes, SensorKind};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const READINGS_BUFFER: usize = 64;

/// A sensor backed by a broadcast channel.
///
/// Whatever feeds it (a device bridge, a synthetic driver, a test) calls
/// [`BroadcastSensor::emit`]; subscribers see only readings emitted after
/// they subscribed.
#[derive(Clone)]
pub struct BroadcastSensor {
    kind: SensorKind,
    sender: broadcast::Sender<Axes>,
    interval: Arc<Mutex<Duration>>,
}

impl BroadcastSensor {
    pub fn new(kind: SensorKind) -> Self {
        let (sender, _) = broadcast::channel(READINGS_BUFFER);
        Self {
            kind,
            sender,
            interval: Arc::new(Mutex::new(Duration::from_millis(100))),
        }
    }

    /// Publishes a reading. Returns how many subscribers received it.
    pub fn emit(&self, axes: Axes) -> usize {
        self.sender.send(axes).unwrap_or(0)
    }

    pub fn update_interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl SensorStream for BroadcastSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn set_update_interval(&self, interval: Duration) {
        *self.interval.lock() = interval;
    }

    fn subscribe(&self) -> broadcast::Receiver<Axes> {
        self.sender.subscribe()
    }
}

/// Feeds `sensor` a bounded random walk at its configured update interval.
///
/// Readings are only generated while someone is subscribed. Abort the
/// returned handle to stop it.
pub fn spawn_synthetic(sensor: BroadcastSensor) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut axes = Axes::default();
        loop {
            tokio::time::sleep(sensor.update_interval()).await;
            if sensor.subscriber_count() == 0 {
                continue;
            }
            axes = Axes::new(
                step(&mut rng, axes.x),
                step(&mut rng, axes.y),
                step(&mut rng, axes.z),
            );
            sensor.emit(axes);
        }
    })
}

fn step(rng: &mut StdRng, value: f64) -> f64 {
    (value + rng.gen_range(-0.5..=0.5)).clamp(-20.0, 20.0)
}

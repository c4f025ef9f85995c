use serde::{Deserialize, Serialize};
use std::fmt;

/// Components per assembled vector: three axes for each of three sensors.
pub const VECTOR_WIDTH: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer,
    Magnetometer,
    Gyroscope,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Accelerometer,
        SensorKind::Magnetometer,
        SensorKind::Gyroscope,
    ];

    fn offset(self) -> usize {
        match self {
            SensorKind::Accelerometer => 0,
            SensorKind::Magnetometer => 3,
            SensorKind::Gyroscope => 6,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Gyroscope => "gyroscope",
        };
        f.write_str(name)
    }
}

/// One 3-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Most recent reading per sensor. Sensors that have not reported read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatestReadings {
    readings: [Option<Axes>; 3],
}

impl LatestReadings {
    pub fn record(&mut self, kind: SensorKind, axes: Axes) {
        self.readings[kind as usize] = Some(axes);
    }

    pub fn get(&self, kind: SensorKind) -> Option<Axes> {
        self.readings[kind as usize]
    }

    pub fn assemble(&self) -> SensorVector {
        let mut components = [0.0; VECTOR_WIDTH];
        for kind in SensorKind::ALL {
            let axes = self.get(kind).unwrap_or_default();
            let offset = kind.offset();
            components[offset] = axes.x;
            components[offset + 1] = axes.y;
            components[offset + 2] = axes.z;
        }
        SensorVector(components)
    }
}

/// `[accX, accY, accZ, magX, magY, magZ, gyrX, gyrY, gyrZ]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorVector(pub [f64; VECTOR_WIDTH]);

impl SensorVector {
    pub fn components(&self) -> &[f64; VECTOR_WIDTH] {
        &self.0
    }
}

/// Fixed-capacity run of vectors, uploaded once full.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorBatch {
    vectors: Vec<SensorVector>,
    capacity: usize,
}

impl SensorBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vectors: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a vector and reports whether the batch is now sealed.
    ///
    /// Vectors pushed into a sealed batch are dropped.
    pub fn push(&mut self, vector: SensorVector) -> bool {
        if !self.is_full() {
            self.vectors.push(vector);
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.vectors.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Consumes the batch into the flat `capacity * 9` sequence the uploader sends.
    pub fn into_flat(self) -> Vec<f64> {
        self.vectors
            .into_iter()
            .flat_map(|vector| vector.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_zero_fills_missing_sensors() {
        let mut latest = LatestReadings::default();
        assert_eq!(latest.assemble(), SensorVector([0.0; VECTOR_WIDTH]));

        latest.record(SensorKind::Magnetometer, Axes::new(4.0, 5.0, 6.0));
        assert_eq!(
            latest.assemble().components(),
            &[0.0, 0.0, 0.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_assemble_uses_most_recent_reading() {
        let mut latest = LatestReadings::default();
        latest.record(SensorKind::Accelerometer, Axes::new(1.0, 1.0, 1.0));
        latest.record(SensorKind::Accelerometer, Axes::new(2.0, 3.0, 4.0));
        latest.record(SensorKind::Gyroscope, Axes::new(7.0, 8.0, 9.0));

        assert_eq!(
            latest.assemble().components(),
            &[2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_batch_seals_at_capacity() {
        let mut batch = SensorBatch::with_capacity(3);
        assert!(!batch.push(SensorVector::default()));
        assert!(!batch.push(SensorVector::default()));
        assert!(batch.push(SensorVector([1.0; VECTOR_WIDTH])));

        // Sealed: further pushes are ignored
        assert!(batch.push(SensorVector([2.0; VECTOR_WIDTH])));
        assert_eq!(batch.len(), 3);

        let flat = batch.into_flat();
        assert_eq!(flat.len(), 3 * VECTOR_WIDTH);
        assert_eq!(&flat[18..], &[1.0; VECTOR_WIDTH]);
    }
}

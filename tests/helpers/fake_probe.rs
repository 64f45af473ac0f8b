//! A `ResourceProbe` whose readings are controlled by the test.

use async_trait::async_trait;
use repowatch::core::{ResourceProbe, SampleError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeProbe {
    readings: Arc<Mutex<Readings>>,
}

#[derive(Debug)]
struct Readings {
    cpu: Option<f64>,
    memory: Option<f64>,
}

impl FakeProbe {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self {
            readings: Arc::new(Mutex::new(Readings {
                cpu: Some(cpu),
                memory: Some(memory),
            })),
        }
    }

    /// Sets the next readings; `None` makes that measurement fail.
    pub fn set(&self, cpu: Option<f64>, memory: Option<f64>) {
        let mut readings = self.readings.lock().unwrap();
        readings.cpu = cpu;
        readings.memory = memory;
    }
}

#[async_trait]
impl ResourceProbe for FakeProbe {
    async fn cpu_percent(&mut self, _window: Duration) -> Result<f64, SampleError> {
        self.readings
            .lock()
            .unwrap()
            .cpu
            .ok_or_else(|| SampleError::CpuUnavailable("fake failure".to_string()))
    }

    async fn memory_used_percent(&mut self) -> Result<f64, SampleError> {
        self.readings
            .lock()
            .unwrap()
            .memory
            .ok_or_else(|| SampleError::MemoryUnavailable("fake failure".to_string()))
    }
}

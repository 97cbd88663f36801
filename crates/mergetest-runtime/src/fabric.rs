//! In-process port fabric
//!
//! Every port has two directions, each a bounded channel of raw frames:
//! - egress: what senders transmit on the port
//! - ingress: what receivers on the port observe
//!
//! Any number of producers may hold a sender for either direction, but each
//! direction has exactly one consumer, claimed once.

use std::collections::HashMap;

use bytes::BytesMut;
use mergetest_core::{HarnessError, HarnessResult, PortId};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A raw frame in flight between lanes
pub type Frame = BytesMut;

/// Default channel depth per port direction
pub const DEFAULT_PORT_CAPACITY: usize = 1024;

struct Direction {
    tx: mpsc::Sender<Frame>,
    rx: Option<mpsc::Receiver<Frame>>,
}

impl Direction {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Direction { tx, rx: Some(rx) }
    }
}

struct PortChannels {
    egress: Direction,
    ingress: Direction,
}

/// Fixed set of ports numbered `0..port_count`
pub struct PortFabric {
    ports: Mutex<HashMap<PortId, PortChannels>>,
}

impl PortFabric {
    pub fn new(port_count: u16, capacity: usize) -> Self {
        let ports = (0..port_count)
            .map(|port| {
                (
                    port,
                    PortChannels {
                        egress: Direction::new(capacity),
                        ingress: Direction::new(capacity),
                    },
                )
            })
            .collect();
        PortFabric {
            ports: Mutex::new(ports),
        }
    }

    /// Fabric with just enough ports to cover every id in `ports`
    pub fn covering(ports: &[PortId]) -> Self {
        let count = ports.iter().copied().max().map_or(0, |max| max.saturating_add(1));
        Self::new(count, DEFAULT_PORT_CAPACITY)
    }

    pub fn port_count(&self) -> usize {
        self.ports.lock().len()
    }

    /// Producer handle for frames transmitted on `port`
    pub fn egress_sender(&self, port: PortId) -> HarnessResult<mpsc::Sender<Frame>> {
        self.with_port(port, |ch| Ok(ch.egress.tx.clone()))
    }

    /// Claim the consumer of frames transmitted on `port`
    pub fn take_egress(&self, port: PortId) -> HarnessResult<mpsc::Receiver<Frame>> {
        self.with_port(port, |ch| ch.egress.rx.take().ok_or(HarnessError::PortInUse(port)))
    }

    /// Producer handle for frames arriving on `port`
    pub fn ingress_sender(&self, port: PortId) -> HarnessResult<mpsc::Sender<Frame>> {
        self.with_port(port, |ch| Ok(ch.ingress.tx.clone()))
    }

    /// Claim the consumer of frames arriving on `port`
    pub fn take_ingress(&self, port: PortId) -> HarnessResult<mpsc::Receiver<Frame>> {
        self.with_port(port, |ch| {
            ch.ingress.rx.take().ok_or(HarnessError::PortInUse(port))
        })
    }

    fn with_port<T>(
        &self,
        port: PortId,
        f: impl FnOnce(&mut PortChannels) -> HarnessResult<T>,
    ) -> HarnessResult<T> {
        let mut ports = self.ports.lock();
        let channels = ports.get_mut(&port).ok_or(HarnessError::UnknownPort(port))?;
        f(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covering_sizes_fabric() {
        assert_eq!(PortFabric::covering(&[0, 1, 0]).port_count(), 2);
        assert_eq!(PortFabric::covering(&[3]).port_count(), 4);
        assert_eq!(PortFabric::covering(&[]).port_count(), 0);
    }

    #[test]
    fn test_unknown_port() {
        let fabric = PortFabric::new(2, 8);
        assert!(matches!(
            fabric.egress_sender(2),
            Err(HarnessError::UnknownPort(2))
        ));
        assert!(matches!(
            fabric.take_ingress(7),
            Err(HarnessError::UnknownPort(7))
        ));
    }

    #[test]
    fn test_consumers_claimed_once() {
        let fabric = PortFabric::new(1, 8);

        assert!(fabric.take_egress(0).is_ok());
        assert!(matches!(fabric.take_egress(0), Err(HarnessError::PortInUse(0))));

        assert!(fabric.take_ingress(0).is_ok());
        assert!(matches!(fabric.take_ingress(0), Err(HarnessError::PortInUse(0))));
    }

    #[tokio::test]
    async fn test_directions_are_separate() {
        let fabric = PortFabric::new(1, 8);
        let mut egress = fabric.take_egress(0).unwrap();
        let mut ingress = fabric.take_ingress(0).unwrap();

        fabric
            .egress_sender(0)
            .unwrap()
            .send(BytesMut::from(&b"out"[..]))
            .await
            .unwrap();
        fabric
            .ingress_sender(0)
            .unwrap()
            .send(BytesMut::from(&b"in"[..]))
            .await
            .unwrap();

        assert_eq!(&egress.recv().await.unwrap()[..], b"out");
        assert_eq!(&ingress.recv().await.unwrap()[..], b"in");
    }
}

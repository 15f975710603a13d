//! Candidate gathering
//!
//! Per-endpoint producer of connectivity candidates. Probes complete
//! asynchronously and in no particular order relative to other endpoints;
//! sequence numbers are assigned here, at emission, and are monotonic per
//! endpoint. The gatherer checks its shutdown flag every cycle, so emission
//! after the endpoint closes is a silent no-op.
//!
//! Probing is simulated: each cycle yields one host candidate with a random
//! port, the way a real agent would surface one interface binding at a time.

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, trace};

use crate::config::CoordinatorConfig;
use crate::types::{Candidate, EndpointId};

/// Spawned candidate producer for one endpoint
pub struct CandidateGatherer;

impl CandidateGatherer {
    /// Begin gathering for `endpoint`, pushing each candidate into `tx` for
    /// the coordinator's relay loop. The task exits when all probes have
    /// completed or `shutdown` flips, whichever comes first.
    pub fn spawn(
        endpoint: EndpointId,
        config: &CoordinatorConfig,
        tx: mpsc::Sender<Candidate>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let interval = config.gather_interval;
        let max_candidates = config.max_candidates;

        tokio::spawn(async move {
            debug!("Gathering candidates for endpoint {}", endpoint);
            let mut ticker = time::interval(interval);
            let mut sequence: u64 = 0;

            while sequence < max_candidates as u64 {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => {}
                }
                if *shutdown.borrow() {
                    debug!("Gathering stopped for closed endpoint {}", endpoint);
                    return;
                }

                sequence += 1;
                let candidate = probe(&endpoint, sequence);
                trace!("Endpoint {} gathered candidate seq {}", endpoint, sequence);

                // Endpoint closed between the shutdown check and the send;
                // dropping the candidate is the contract, not an error.
                if tx.send(candidate).await.is_err() {
                    debug!("Candidate channel closed for endpoint {}", endpoint);
                    return;
                }
            }
            debug!(
                "Gathering complete for endpoint {} ({} candidates)",
                endpoint, sequence
            );
        })
    }
}

/// One completed connectivity probe
fn probe(endpoint: &EndpointId, sequence: u64) -> Candidate {
    let mut rng = rand::thread_rng();
    let port: u16 = rng.gen_range(10_000..60_000);
    let priority = 2_130_706_431u32.saturating_sub(sequence as u32);

    Candidate {
        endpoint: endpoint.clone(),
        payload: format!(
            "candidate:{sequence} 1 UDP {priority} 192.168.1.{} {port} typ host",
            (sequence % 254) + 1
        ),
        sequence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick_config(max: u32) -> CoordinatorConfig {
        CoordinatorConfig::builder()
            .gather_interval(Duration::from_millis(1))
            .max_candidates(max)
            .build()
    }

    #[tokio::test]
    async fn emits_monotonic_sequences() {
        let endpoint = EndpointId::new();
        let (tx, mut rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = CandidateGatherer::spawn(endpoint.clone(), &quick_config(5), tx, shutdown_rx);

        let mut sequences = Vec::new();
        while let Some(candidate) = rx.recv().await {
            assert_eq!(candidate.endpoint, endpoint);
            sequences.push(candidate.sequence);
        }
        task.await.unwrap();

        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn shutdown_stops_emission() {
        let endpoint = EndpointId::new();
        let (tx, mut rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = CandidateGatherer::spawn(endpoint, &quick_config(1_000), tx, shutdown_rx);

        // Let a few probes complete, then close the endpoint
        let first = rx.recv().await.expect("at least one candidate");
        assert_eq!(first.sequence, 1);
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        // Whatever was in flight is bounded; the channel then closes
        let mut remaining = 0;
        while rx.recv().await.is_some() {
            remaining += 1;
        }
        assert!(remaining < 1_000);
    }
}

//! # Transmitter
//!
//! A thin wrapper over the [`SessionBus`]. Holds no transfer state; its
//! only job is marshalling one [`Action`] variant onto the wire per call.

use std::sync::Arc;

use crate::action::Action;
use crate::bus::SessionBus;
use crate::status::StatusCode;

/// Marshals [`Action`]s onto a [`SessionBus`].
pub struct Transmitter {
    bus: Arc<dyn SessionBus>,
}

impl Transmitter {
    /// Wraps a concrete bus.
    pub fn new(bus: Arc<dyn SessionBus>) -> Self {
        Self { bus }
    }

    /// Sends one action. Panics if called with an internal-only action
    /// (`FileIDResponse`); those never reach the transmitter — the
    /// dispatcher routes them directly to the directed announcement
    /// manager instead.
    pub async fn transmit(&self, action: &Action) -> StatusCode {
        match action {
            Action::Announce {
                peer,
                file_list,
                is_offer_response,
            } => {
                self.bus
                    .send_announcement(file_list, peer, *is_offer_response)
                    .await
            }
            Action::RequestData {
                peer,
                file_id,
                start_byte,
                length,
                max_chunk_size,
            } => {
                self.bus
                    .send_request_data(*file_id, *start_byte, *length, *max_chunk_size, peer)
                    .await
            }
            Action::DataChunk {
                peer,
                file_id,
                start_byte,
                chunk,
                ..
            } => self.bus.send_data_chunk(*file_id, *start_byte, chunk, peer).await,
            Action::OfferFile { peer, descriptor } => {
                self.bus.send_offer_file(descriptor, peer).await
            }
            Action::RequestAnnouncement { peer } => self.bus.send_announcement_request(peer).await,
            Action::StopXfer { peer, file_id } => self.bus.send_stop_xfer(*file_id, peer).await,
            Action::XferCancelled { peer, file_id } => {
                self.bus.send_xfer_cancelled(*file_id, peer).await
            }
            Action::RequestOffer { peer, file_path } => {
                self.bus.send_request_offer(file_path, peer).await
            }
            Action::FileIDResponse { .. } => {
                unreachable!("FileIDResponse never reaches the transmitter")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MockBus;
    use crate::descriptor::FileDescriptor;

    #[tokio::test]
    async fn announce_is_forwarded_to_the_bus() {
        let bus = Arc::new(MockBus::new());
        let tx = Transmitter::new(bus.clone());
        let status = tx
            .transmit(&Action::Announce {
                peer: "peerB".into(),
                file_list: vec![],
                is_offer_response: false,
            })
            .await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(bus.sent_calls(), vec!["announce"]);
    }

    #[tokio::test]
    async fn offer_file_is_forwarded_as_a_method_call() {
        let bus = Arc::new(MockBus::new());
        let tx = Transmitter::new(bus.clone());
        let descriptor = FileDescriptor {
            owner: "me".into(),
            shared_path: "".into(),
            relative_path: "".into(),
            filename: "f".into(),
            file_id: [1; 20],
            size: 1,
        };
        tx.transmit(&Action::OfferFile {
            peer: "peerB".into(),
            descriptor,
        })
        .await;
        assert_eq!(bus.sent_calls(), vec!["offer_file"]);
    }
}

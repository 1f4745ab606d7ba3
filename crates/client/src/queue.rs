use fleetgate_core::domain::booking::{BookingDetails, BookingId};

use crate::{ApprovalClient, ClientError, Decision};

/// An approver's view of their queue.
///
/// The list only ever changes by replacing it with a fresh server copy. A
/// failed call, or a decision whose refetch failed, leaves it as it was.
#[derive(Clone, Debug, Default)]
pub struct ApprovalQueue {
    items: Vec<BookingDetails>,
}

impl ApprovalQueue {
    pub fn items(&self) -> &[BookingDetails] {
        &self.items
    }

    pub fn ids(&self) -> Vec<BookingId> {
        self.items.iter().map(|details| details.booking.id).collect()
    }

    pub async fn refresh(&mut self, client: &ApprovalClient) -> Result<(), ClientError> {
        self.items = client.pending().await?;
        Ok(())
    }

    pub async fn approve(
        &mut self,
        client: &ApprovalClient,
        id: BookingId,
    ) -> Result<BookingDetails, ClientError> {
        let decision = client.approve(id).await?;
        Ok(self.accept(decision))
    }

    pub async fn reject(
        &mut self,
        client: &ApprovalClient,
        id: BookingId,
    ) -> Result<BookingDetails, ClientError> {
        let decision = client.reject(id).await?;
        Ok(self.accept(decision))
    }

    fn accept(&mut self, decision: Decision) -> BookingDetails {
        if let Ok(pending) = decision.pending {
            self.items = pending;
        }
        decision.booking
    }
}

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by the services after a state change has been committed.
///
/// Consumers must tolerate missed events; the channel is bounded and
/// senders drop events (with a warning) rather than block request handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Purchase order events
    PurchaseOrderCreated(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Invoice events
    InvoiceCreated(Uuid),
    InvoiceStatusChanged {
        invoice_id: Uuid,
        old_status: String,
        new_status: String,
    },
    InvoiceSettled {
        invoice_id: Uuid,
        payment_status: String,
    },

    // Payment events
    PaymentRecorded(Uuid),
    PaymentCleared(Uuid),
    PaymentRejected(Uuid),

    // Delivery note events
    DeliveryNoteCreated(Uuid),
    DeliveryNoteDelivered(Uuid),
    DeliveryNoteCancelled(Uuid),

    // Swap events
    SwapRecorded {
        swap_id: Uuid,
        invoice_id: Uuid,
    },

    // Master data events
    CustomerCreated(Uuid),
    ProductCreated(Uuid),
    TaxActivated(Uuid),
    UserCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel and logs each event.
///
/// Runs for the lifetime of the process as a background task; returns
/// when every sender has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    from = %old_status,
                    to = %new_status,
                    "Order status changed"
                );
            }
            Event::PurchaseOrderStatusChanged {
                purchase_order_id,
                old_status,
                new_status,
            } => {
                info!(
                    purchase_order_id = %purchase_order_id,
                    from = %old_status,
                    to = %new_status,
                    "Purchase order status changed"
                );
            }
            Event::InvoiceStatusChanged {
                invoice_id,
                old_status,
                new_status,
            } => {
                info!(
                    invoice_id = %invoice_id,
                    from = %old_status,
                    to = %new_status,
                    "Invoice status changed"
                );
            }
            Event::InvoiceSettled {
                invoice_id,
                payment_status,
            } => {
                info!(
                    invoice_id = %invoice_id,
                    payment_status = %payment_status,
                    "Invoice settled"
                );
            }
            other => {
                debug!(event = ?other, "Event received");
            }
        }
    }

    info!("Event channel closed, stopping event processing loop");
}

use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, InvoiceConfirmedEvent, InvoicePaidEvent};

/// The producer ends of every configured hook, handed to the reconciliation API.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub invoice_paid_producer: Vec<EventProducer<InvoicePaidEvent>>,
    pub invoice_confirmed_producer: Vec<EventProducer<InvoiceConfirmedEvent>>,
}

pub struct EventHandlers {
    pub on_invoice_paid: Option<EventHandler<InvoicePaidEvent>>,
    pub on_invoice_confirmed: Option<EventHandler<InvoiceConfirmedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_invoice_paid = hooks.on_invoice_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_invoice_confirmed = hooks.on_invoice_confirmed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_invoice_paid, on_invoice_confirmed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_invoice_paid {
            result.invoice_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_invoice_confirmed {
            result.invoice_confirmed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_invoice_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_invoice_confirmed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_invoice_paid: Option<Handler<InvoicePaidEvent>>,
    pub on_invoice_confirmed: Option<Handler<InvoiceConfirmedEvent>>,
}

impl EventHooks {
    pub fn on_invoice_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(InvoicePaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_invoice_paid = Some(Arc::new(f));
        self
    }

    pub fn on_invoice_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(InvoiceConfirmedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_invoice_confirmed = Some(Arc::new(f));
        self
    }
}

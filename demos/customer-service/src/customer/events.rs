use jade_cqrs::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CustomerEvent {
    Created {
        #[serde(rename = "customerId")]
        customer_id: String,
        name: String,
        email: String,
        phone: Option<String>,
    },
    Updated {
        name: String,
        email: String,
        phone: Option<String>,
    },
    WelcomeEmailSent,
}

impl Event for CustomerEvent {
    fn schema(&self) -> &'static str {
        match self {
            CustomerEvent::Created { .. } => "urn:schema:jade:event:customer:created:2",
            CustomerEvent::Updated { .. } => "urn:schema:jade:event:customer:updated:1",
            CustomerEvent::WelcomeEmailSent => "urn:schema:jade:event:customer:welcome-email-sent:1",
        }
    }
}

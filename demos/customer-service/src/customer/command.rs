use jade_cqrs::{Command, IntoAggregateCommand, Metadata};
use serde::{Deserialize, Serialize};

use super::aggregate::Customer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomerCommand {
    Create {
        #[serde(rename = "customerId")]
        customer_id: String,
        name: String,
        email: String,
        phone: Option<String>,
        metadata: Metadata,
    },
    Update {
        name: String,
        email: String,
        phone: Option<String>,
        metadata: Metadata,
    },
}

impl CustomerCommand {
    pub fn metadata(&self) -> &Metadata {
        match self {
            CustomerCommand::Create { metadata, .. } => metadata,
            CustomerCommand::Update { metadata, .. } => metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub metadata: Metadata,
}

impl Command for CreateCustomer {
    const SCHEMA: &'static str = "urn:schema:jade:command:customer:create:1";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl IntoAggregateCommand<Customer> for CreateCustomer {
    fn aggregate_id(&self) -> Option<String> {
        Some(self.customer_id.clone())
    }

    fn into_aggregate_command(self) -> CustomerCommand {
        CustomerCommand::Create {
            customer_id: self.customer_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub metadata: Metadata,
}

impl Command for UpdateCustomer {
    const SCHEMA: &'static str = "urn:schema:jade:command:customer:update:1";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl IntoAggregateCommand<Customer> for UpdateCustomer {
    fn aggregate_id(&self) -> Option<String> {
        Some(self.customer_id.clone())
    }

    fn into_aggregate_command(self) -> CustomerCommand {
        CustomerCommand::Update {
            name: self.name,
            email: self.email,
            phone: self.phone,
            metadata: self.metadata,
        }
    }
}

use jade_cqrs::Aggregate;
use serde::{Deserialize, Serialize};

use super::command::CustomerCommand;
use super::errors::CustomerError;
use super::events::CustomerEvent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub welcome_email_sent: bool,
}

impl Aggregate for Customer {
    const PREFIX: &'static str = "customer";

    type Command = CustomerCommand;
    type Event = CustomerEvent;
    type Error = CustomerError;

    fn create(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::Create {
                customer_id,
                name,
                email,
                phone,
                ..
            } => {
                if email.is_empty() {
                    return Err(CustomerError::EmptyEmail);
                }
                Ok(vec![CustomerEvent::Created {
                    customer_id: customer_id.clone(),
                    name: name.clone(),
                    email: email.clone(),
                    phone: phone.clone(),
                }])
            }
            CustomerCommand::Update { .. } => Err(CustomerError::NotInitialized),
        }
    }

    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::Create { .. } => Err(CustomerError::AlreadyExists),
            CustomerCommand::Update {
                name, email, phone, ..
            } => {
                if email.is_empty() {
                    return Err(CustomerError::EmptyEmail);
                }
                Ok(vec![CustomerEvent::Updated {
                    name: name.clone(),
                    email: email.clone(),
                    phone: phone.clone(),
                }])
            }
        }
    }

    fn init(event: Self::Event) -> Self {
        let mut customer = Self::default();
        customer.evolve(event);
        customer
    }

    fn evolve(&mut self, event: Self::Event) {
        match event {
            CustomerEvent::Created {
                customer_id,
                name,
                email,
                phone,
            } => {
                self.id = customer_id;
                self.name = name;
                self.email = email;
                self.phone = phone;
            }
            CustomerEvent::Updated { name, email, phone } => {
                self.name = name;
                self.email = email;
                self.phone = phone;
            }
            CustomerEvent::WelcomeEmailSent => {
                self.welcome_email_sent = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jade_cqrs::Metadata;

    fn meta() -> Metadata {
        Metadata::new("m1", "k1")
    }

    #[test]
    fn create_emits_created_event() {
        let command = CustomerCommand::Create {
            customer_id: "c1".to_string(),
            name: "Alice".to_string(),
            email: "a@x".to_string(),
            phone: None,
            metadata: meta(),
        };
        let events = Customer::create(&command).unwrap();
        assert_eq!(
            events,
            vec![CustomerEvent::Created {
                customer_id: "c1".to_string(),
                name: "Alice".to_string(),
                email: "a@x".to_string(),
                phone: None,
            }]
        );
    }

    #[test]
    fn update_against_rehydrated_state_produces_new_fields() {
        let customer = Customer::init(CustomerEvent::Created {
            customer_id: "c1".to_string(),
            name: "Alice".to_string(),
            email: "a@x".to_string(),
            phone: None,
        });
        let command = CustomerCommand::Update {
            name: "Alice2".to_string(),
            email: "a2@x".to_string(),
            phone: None,
            metadata: meta(),
        };
        let events = customer.decide(&command).unwrap();
        let mut rehydrated = customer;
        for event in events {
            rehydrated.evolve(event);
        }
        assert_eq!(rehydrated.name, "Alice2");
        assert_eq!(rehydrated.email, "a2@x");
        assert_eq!(rehydrated.id, "c1");
    }

    #[test]
    fn create_rejects_empty_email() {
        let command = CustomerCommand::Create {
            customer_id: "c1".to_string(),
            name: "Alice".to_string(),
            email: String::new(),
            phone: None,
            metadata: meta(),
        };
        assert!(matches!(
            Customer::create(&command),
            Err(CustomerError::EmptyEmail)
        ));
    }
}

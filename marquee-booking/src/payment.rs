use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment gateway failure: {0}")]
    Gateway(String),
}

/// Payment collaborator. Capture happens after the seat claim and outside any
/// critical section; settlement of refunds is the provider's own concern, the
/// engine only records the computed amount.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Capture the reservation total. Returns the provider reference.
    async fn capture(
        &self,
        reservation_id: Uuid,
        amount_cents: i32,
        currency: &str,
        token: &str,
    ) -> Result<String, PaymentError>;

    /// Issue a refund against a captured payment.
    async fn refund(&self, reference: &str, amount_cents: i32) -> Result<(), PaymentError>;
}

pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn capture(
        &self,
        reservation_id: Uuid,
        _amount_cents: i32,
        _currency: &str,
        token: &str,
    ) -> Result<String, PaymentError> {
        // Triggers for failure-path tests
        match token {
            "fail-gateway" => Err(PaymentError::Gateway(
                "Simulated payment gateway failure".to_string(),
            )),
            "no-funds" => Err(PaymentError::Declined("Insufficient funds".to_string())),
            _ => Ok(format!("mock_ch_{}", reservation_id.simple())),
        }
    }

    async fn refund(&self, reference: &str, _amount_cents: i32) -> Result<(), PaymentError> {
        if reference.starts_with("mock_ch_") {
            Ok(())
        } else {
            Err(PaymentError::Gateway(format!(
                "Unknown charge reference: {}",
                reference
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_capture_and_refund() {
        let gateway = MockGateway;
        let id = Uuid::new_v4();

        let reference = gateway.capture(id, 2000, "USD", "tok_visa").await.unwrap();
        assert!(reference.starts_with("mock_ch_"));
        gateway.refund(&reference, 1800).await.unwrap();

        assert!(matches!(
            gateway.capture(id, 2000, "USD", "no-funds").await,
            Err(PaymentError::Declined(_))
        ));
        assert!(matches!(
            gateway.capture(id, 2000, "USD", "fail-gateway").await,
            Err(PaymentError::Gateway(_))
        ));
    }
}

use chrono::{Duration, Utc};
use marquee_booking::{MockGateway, PaymentInfo, ReservationLifecycle};
use marquee_domain::{
    ContactInfo, ReservationStore, RowTemplate, ScreeningStore, SeatClass, SeatKey, SeatTemplate,
};
use marquee_engine::{Actor, BookSeatsRequest, BookingService, CreateScreeningRequest};
use marquee_store::{DbClient, MemoryStore, PgReservationStore, PgScreeningStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_engine=debug,marquee_booking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::Config::load().expect("Failed to load config");
    tracing::info!(backend = %config.engine.backend, "Starting Marquee engine");

    let (screenings, reservations): (Arc<dyn ScreeningStore>, Arc<dyn ReservationStore>) =
        if config.engine.backend == "postgres" {
            let db = DbClient::new(&config.database.url)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");
            (
                Arc::new(PgScreeningStore::new(db.pool.clone())),
                Arc::new(PgReservationStore::new(db.pool)),
            )
        } else {
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        };

    let service = BookingService::new(
        screenings,
        reservations,
        Arc::new(MockGateway),
        ReservationLifecycle::new(config.policy.clone()),
        config.engine.currency.clone(),
        config.engine.event_buffer,
    );

    // Smoke flow: schedule a screening, book two seats, inspect the map,
    // cancel and report the refund.
    let admin = Actor::admin("ops@marquee.example");
    let customer = Actor::customer("customer-1");

    let starts_at = Utc::now() + Duration::hours(30);
    let screening = service
        .create_screening(
            &admin,
            CreateScreeningRequest {
                theater_id: Uuid::new_v4(),
                movie_id: Uuid::new_v4(),
                starts_at,
                ends_at: starts_at + Duration::hours(2),
                base_price_cents: 1000,
                seat_template: SeatTemplate::new(vec![
                    RowTemplate {
                        label: "A".to_string(),
                        seats: 8,
                        class: SeatClass::Regular,
                    },
                    RowTemplate {
                        label: "B".to_string(),
                        seats: 6,
                        class: SeatClass::Premium,
                    },
                    RowTemplate {
                        label: "C".to_string(),
                        seats: 4,
                        class: SeatClass::Vip,
                    },
                ]),
            },
        )
        .await?;
    tracing::info!(screening_id = %screening.id, "Screening scheduled");

    let reservation = service
        .book_seats(
            &customer,
            BookSeatsRequest {
                screening_id: screening.id,
                seats: vec![SeatKey::new("B", 1), SeatKey::new("B", 2)],
                payment: PaymentInfo {
                    method: "CARD".to_string(),
                    token: Some("tok_demo".to_string()),
                },
                contact: ContactInfo {
                    email: "customer@example.com".to_string(),
                    phone: None,
                },
            },
        )
        .await?;
    tracing::info!(
        reservation_id = %reservation.id,
        total_cents = reservation.total_cents,
        status = %reservation.status,
        "Seats booked"
    );

    let availability = service.get_availability(screening.id).await?;
    let taken = availability.seats.iter().filter(|s| !s.available).count();
    tracing::info!(taken, total = availability.seats.len(), "Seat map snapshot");

    let refund = service
        .cancel_reservation(&customer, reservation.id, Some("demo over".to_string()))
        .await?;
    tracing::info!(refund_cents = refund, "Reservation cancelled");

    Ok(())
}

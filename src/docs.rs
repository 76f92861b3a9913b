use utoipa::OpenApi;

use crate::handlers;
use crate::schemas;
use crate::services::transaction_engine::Pagination;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QR Payment Core",
        description = "QR payment issuance, gateway callback reconciliation and transaction listing"
    ),
    paths(
        handlers::health,
        handlers::qr::generate_qr,
        handlers::qr::payment_callback,
        handlers::transactions::list_transactions,
    ),
    components(schemas(
        handlers::HealthStatus,
        schemas::Amount,
        schemas::GenerateQrRequest,
        schemas::GenerateQrResponse,
        schemas::PaymentCallbackRequest,
        schemas::PaymentCallbackResponse,
        schemas::TransactionSchema,
        schemas::TransactionListResponse,
        schemas::ErrorResponse,
        Pagination,
    )),
    tags(
        (name = "Health", description = "Liveness and dependency status"),
        (name = "QR", description = "QR issuance and payment callbacks"),
        (name = "Transactions", description = "Transaction listing")
    )
)]
pub struct ApiDoc;

//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, chain RPC calls) should be
//! expressed as futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus
//! don’t block execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use solupi_engine::{
    db_types::NewOrder,
    traits::{ChainPayout, RateSource},
    IngestionApi,
    OrderFlowApi,
    OrderManagement,
    OrderPageQuery,
    PriceOracle,
    SettlementDatabase,
};

use crate::{
    data_objects::{AttachReferenceRequest, CreateOrderRequest, EmailNotification, JsonResponse, OrdersQuery, UserRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderManagement, ChainPayout);
/// Route handler for creating a new purchase order.
///
/// The order starts out as `PENDING`. The user then pays the order amount over UPI and reports the bank reference
/// using the `/orders/{id}/reference` endpoint.
pub async fn create_order<B, P>(
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
{
    let request = body.into_inner();
    debug!("💻️ POST new order for {} from user {}", request.amount, request.user_id);
    let order = api.create_order(NewOrder::from(request)).await?;
    Ok(HttpResponse::Created().json(JsonResponse::success(order)))
}

route!(user_orders => Get "/orders" impl OrderManagement, ChainPayout);
/// Route handler for listing a user's orders, newest first.
///
/// Query parameters: `user_id` (or `userId`), and optionally `page`, `limit` and `status`.
pub async fn user_orders<B, P>(
    query: web::Query<OrdersQuery>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
{
    let query = OrderPageQuery::from(query.into_inner());
    if query.user_id.trim().is_empty() {
        return Err(ServerError::ValidationError("Missing required query parameter: userId".into()));
    }
    debug!("💻️ GET orders for {} (page {})", query.user_id, query.page);
    let page = api.orders_for_user(&query).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(page)))
}

route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement, ChainPayout);
pub async fn order_by_id<B, P>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
{
    let order_id = path.into_inner();
    trace!("💻️ GET order {order_id}");
    let order = api.fetch_order(order_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(order)))
}

route!(cancel_order => Delete "/orders/{order_id}" impl OrderManagement, ChainPayout);
/// Route handler for cancelling an order. Only the owner can cancel an order, and only before it has been paid out.
pub async fn cancel_order<B, P>(
    path: web::Path<i64>,
    body: web::Json<UserRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
{
    let order_id = path.into_inner();
    debug!("💻️ DELETE order {order_id} for user {}", body.user_id);
    let order = api.cancel_order(order_id, &body.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(order)))
}

route!(attach_reference => Put "/orders/{order_id}/reference" impl SettlementDatabase, ChainPayout);
/// Route handler for reporting a payment against an order.
///
/// The user supplies the 12-digit bank reference (UTR/RRN) of their UPI payment. If the bank notification has already
/// been received, the order is settled immediately and the response contains the completed order. Otherwise the order
/// waits for the notification, and the settlement report in the response says so.
pub async fn attach_reference<B, P>(
    path: web::Path<i64>,
    body: web::Json<AttachReferenceRequest>,
    api: web::Data<OrderFlowApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    let order_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ PUT reference {} for order {order_id}", request.reference_code);
    let result = api.attach_reference(order_id, &request.reference_code, &request.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(result)))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(email_notification => Post "/email-parse" impl SettlementDatabase, ChainPayout);
/// Route handler for bank notification emails that are pushed by an external mail relay.
///
/// Redeliveries of the same notification are harmless: the payment is only recorded (and settled) once.
pub async fn email_notification<B, P>(
    body: web::Json<EmailNotification>,
    api: web::Data<IngestionApi<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    P: ChainPayout,
{
    let body = body.into_inner().email_body.filter(|b| !b.trim().is_empty());
    let Some(email) = body else {
        return Err(ServerError::ValidationError("Missing 'emailBody' in request body".into()));
    };
    debug!("💻️ POST email notification ({} bytes)", email.len());
    let outcome = api.submit_notification(&email).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(outcome)))
}

//----------------------------------------------   Prices  ----------------------------------------------------
route!(prices => Get "/prices" impl RateSource);
/// Route handler for the current USDC buy rate. Always succeeds; a fixed fallback rate is quoted if the upstream rate
/// provider is unavailable.
pub async fn prices<S>(oracle: web::Data<PriceOracle<S>>) -> Result<HttpResponse, ServerError>
where S: RateSource {
    trace!("💻️ GET prices");
    let quote = oracle.quote().await;
    Ok(HttpResponse::Ok().json(JsonResponse::success(quote)))
}

//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every handler talks to the store and, for some, to the payment gateway. Both are async, so handlers never block
//! the worker thread.
use actix_web::{get, web, HttpResponse, Responder};
use cashfree_tools::WebhookPayload;
use log::*;
use topup_engine::{
    db_types::{AccountId, OrderId},
    AccountApi,
    AccountManagement,
    DeductionApi,
    LedgerDatabase,
    OrderFlowApi,
    PaymentGateway,
};

use crate::{
    config::ServerOptions,
    data_objects::{CreateOrderParams, JsonResponse, OrderRef},
    errors::ServerError,
    helpers::build_return_url,
    integrations::cashfree::webhook_attempt,
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

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where $guard:ident) => {
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
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::[<$guard:camel MiddlewareFactory>]::new());
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
route!(create_order => Post "/create-order" impl LedgerDatabase, PaymentGateway);
/// Route handler for the create-order endpoint
///
/// Writes a new `Initiated` order and opens a gateway order for it. The gateway's payment session payload is returned
/// as-is, so that the client can open the checkout.
///
/// All of `plan`, `amount`, `planDetails`, `accountId` (or `mobileNumber`), `shopName` and `orderId` are required.
pub async fn create_order<B: LedgerDatabase, G: PaymentGateway>(
    body: web::Json<CreateOrderParams>,
    api: web::Data<OrderFlowApi<B, G>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner().into_new_order()?;
    debug!("💻️ POST create-order {} for {}", order.order_id, order.account_id);
    let return_url = build_return_url(&options.return_url_template, &order.order_id, &order.account_id);
    let session = api.create_order(order, return_url).await?;
    Ok(HttpResponse::Ok().json(session))
}

route!(verify => Post "/verify" impl LedgerDatabase, PaymentGateway);
/// Route handler for the verify endpoint
///
/// Asks the gateway about a single order and applies the answer straight away. The response describes what happened
/// to the order. Failed and cancelled payments are reported as errors (402).
pub async fn verify<B: LedgerDatabase, G: PaymentGateway>(
    body: web::Json<OrderRef>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let (account_id, order_id) = body.into_inner().ids()?;
    debug!("💻️ POST verify {order_id} for {account_id}");
    let outcome = api.verify_order(&account_id, &order_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(webhook => Post "/webhook" impl LedgerDatabase, PaymentGateway where webhook_signature);
/// Route handler for gateway payment webhooks. The signature has already been checked by the middleware.
///
/// Once the payload has been accepted, the delivery is always acknowledged with a 200, even if the order could not be
/// processed. The scheduled checker picks such orders up later.
pub async fn webhook<B: LedgerDatabase, G: PaymentGateway>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let payload = serde_json::from_slice::<WebhookPayload>(&body).map_err(|e| {
        warn!("💻️ Could not parse webhook payload. {e}");
        ServerError::InvalidRequestBody(format!("Malformed webhook payload. {e}"))
    })?;
    let (Some(order_id), Some(phone)) = (payload.order_id(), payload.customer_phone()) else {
        warn!("💻️ Webhook payload is missing the order id or customer phone. {payload:?}");
        return Err(ServerError::InvalidRequestBody("Missing order id or customer phone".into()));
    };
    let (account_id, order_id) = (AccountId::from(phone.trim()), OrderId::from(order_id.trim()));
    let attempt = webhook_attempt(&payload);
    info!("💻️ Webhook: {} for order {order_id} ({account_id})", attempt.status);
    let response = match api.process_payment_notification(&account_id, &order_id, attempt).await {
        Ok(outcome) => {
            debug!("💻️ Webhook for {order_id} processed. {outcome:?}");
            JsonResponse::success("Webhook processed")
        },
        Err(e) => {
            error!("💻️ Webhook for {order_id} could not be processed. {e}");
            JsonResponse::failure(format!("Webhook received, but not processed. {e}"))
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(cashfree_webhook => Post "/cashfree-webhook" impl LedgerDatabase, PaymentGateway where webhook_signature);
/// The same as [`webhook`], at the path the gateway dashboard was originally configured with.
pub async fn cashfree_webhook<B: LedgerDatabase, G: PaymentGateway>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    webhook(body, api).await
}

//----------------------------------------------   Accounts  ----------------------------------------------------
route!(account => Get "/account/{account_id}" impl AccountManagement);
/// Route handler for the account endpoint
///
/// Returns the account balance together with its recharge history, deductions and live orders.
pub async fn account<B: AccountManagement>(
    path: web::Path<String>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let account_id = AccountId::from(path.into_inner());
    debug!("💻️ GET account {account_id}");
    let overview = api
        .account_overview(&account_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Account {account_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(overview))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(trigger_deduction => Post "/trigger-deduction" impl LedgerDatabase where admin_token);
/// Runs the daily deduction now, regardless of the schedule.
pub async fn trigger_deduction<B: LedgerDatabase>(api: web::Data<DeductionApi<B>>) -> Result<HttpResponse, ServerError> {
    info!("💻️ Manual deduction triggered");
    let summary = api.run_daily_deduction().await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(trigger_polling => Post "/trigger-polling" impl LedgerDatabase, PaymentGateway where admin_token);
/// Runs one sweep of the payment checker now.
pub async fn trigger_polling<B: LedgerDatabase, G: PaymentGateway>(
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ Manual payment check triggered");
    let summary = api.poll_pending_orders().await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(orders_for_review => Get "/orders/review" impl AccountManagement where admin_token);
/// Lists the orders that need a human: payments that could not be credited and unrecognised payment statuses.
pub async fn orders_for_review<B: AccountManagement>(
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for review");
    let orders = api.orders_for_review().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(release_order => Post "/orders/review/release" impl LedgerDatabase, PaymentGateway where admin_token);
/// Puts an order that was held for review back in the `Pending` state. Only do this once the cause has been fixed.
pub async fn release_order<B: LedgerDatabase, G: PaymentGateway>(
    body: web::Json<OrderRef>,
    api: web::Data<OrderFlowApi<B, G>>,
) -> Result<HttpResponse, ServerError> {
    let (account_id, order_id) = body.into_inner().ids()?;
    info!("💻️ Releasing order {order_id} for {account_id} from review");
    let order = api.reconciler().release_for_review(&account_id, &order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

mod domain;
mod error;
mod messages;
mod stores;
mod clients;
mod notify;
mod service;

mod app_system;

#[cfg(test)]
mod mock_framework;

use rust_decimal_macros::dec;
use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, StoreSystem};
use crate::domain::OrderStatus;
use crate::error::StoreError;
use crate::service::ItemRequest;

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting storefront with the complete back office");

    let system = StoreSystem::new();

    let span = tracing::info_span!("catalog_setup");
    let (widget, gadget, gizmo) = async {
        info!("Registering the launch catalog");
        let widget = system
            .catalog
            .register_product("Widget", "A standard widget", dec!(10.00), 5)
            .await?;
        let gadget = system
            .catalog
            .register_product("Gadget", "A premium gadget", dec!(25.50), 8)
            .await?;
        let gizmo = system
            .catalog
            .register_product("Gizmo", "A curious gizmo", dec!(7.99), 0)
            .await?;
        Ok::<_, StoreError>((widget, gadget, gizmo))
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("user_onboarding");
    let (alice, bob) = async {
        info!("Registering users");
        let alice = system
            .accounts
            .register_user("Alice", "alice@example.com", "wonderland")
            .await?;
        let bob = system
            .accounts
            .register_user("Bob", "bob@example.com", "builder99")
            .await?;

        // Alice opts into the messaging channels.
        let alice = system
            .accounts
            .update_profile(
                alice.id,
                None,
                Some("+15550100".to_string()),
                Some("@alice".to_string()),
            )
            .await?;
        Ok::<_, StoreError>((alice, bob))
    }
    .instrument(span)
    .await?;

    let signed_in = system
        .accounts
        .authenticate("alice@example.com", "wonderland")
        .await?;
    info!(user_id = %signed_in.id, "Alice signed in");

    let span = tracing::info_span!("order_processing");
    let first = async {
        info!("Placing orders");
        let first = system
            .orders
            .create_order(
                alice.id,
                vec![
                    ItemRequest::new(widget.id, 3),
                    ItemRequest::new(gadget.id, 2),
                ],
            )
            .await?;
        info!(order_id = %first.id, total = %first.total, "Alice's order placed");

        let second = system
            .orders
            .create_order(bob.id, vec![ItemRequest::new(gadget.id, 1)])
            .await?;
        info!(order_id = %second.id, total = %second.total, "Bob's order placed");

        system.orders.complete_order(first.id).await?;
        info!(order_id = %first.id, "Alice's order completed");

        system.orders.cancel_order(second.id).await?;
        info!(order_id = %second.id, "Bob's order cancelled, stock restored");

        Ok::<_, StoreError>(first)
    }
    .instrument(span)
    .await?;

    // The gizmo shelf is empty, so the reservation must refuse this one.
    match system
        .orders
        .create_order(bob.id, vec![ItemRequest::new(gizmo.id, 1)])
        .await
    {
        Ok(order) => info!(order_id = %order.id, "Order processed successfully"),
        Err(e) => error!(error = %e, "Order refused"),
    }

    let span = tracing::info_span!("catalog_maintenance");
    async {
        info!("Running catalog maintenance");
        let restocked = system.catalog.set_stock(gizmo.id, 6).await?;
        info!(
            product_id = %restocked.id,
            stock = restocked.stock_available,
            "Gizmo shelf restocked"
        );

        let repriced = system
            .catalog
            .update_product(gadget.id, "Gadget", "A premium gadget", dec!(23.50))
            .await?;
        info!(product_id = %repriced.id, price = %repriced.price, "Gadget marked down");

        system.catalog.remove_product(widget.id).await?;
        info!(product_id = %widget.id, "Widget discontinued");

        Ok::<_, StoreError>(())
    }
    .instrument(span)
    .await?;

    // The shelf is stocked now, so this one goes through.
    if let Some(shelf) = system.catalog.product(gizmo.id).await? {
        info!(stock = shelf.stock_available, "Gizmo back in stock");
    }
    let retry = system
        .orders
        .create_order(bob.id, vec![ItemRequest::new(gizmo.id, 2)])
        .await?;
    info!(order_id = %retry.id, total = %retry.total, "Bob's gizmo order placed");

    let in_stock = system.catalog.catalog().await?;
    info!(listed = in_stock.len(), "Catalog listing");
    for product in system.catalog.search("gadget").await? {
        info!(
            product_id = %product.id,
            name = %product.name,
            stock = product.stock_available,
            "Search hit"
        );
    }

    let span = tracing::info_span!("order_queries");
    async {
        let pending = system
            .orders
            .orders_with_status(OrderStatus::Pending)
            .await?;
        info!(count = pending.len(), "Orders awaiting completion");

        let bobs_orders = system.orders.orders_for_user(bob.id).await?;
        info!(user_id = %bob.id, orders = bobs_orders.len(), "Bob's orders on file");

        if let Some(order) = system.orders.order(first.id).await? {
            info!(order_id = %order.id, status = %order.status, "Alice's first order");
        }

        Ok::<_, StoreError>(())
    }
    .instrument(span)
    .await?;

    let report = system.reports.report_today().await?;
    info!(
        orders = report.orders_count,
        revenue = %report.total_revenue,
        "Today's sales"
    );
    for line in &report.per_product {
        info!(product = %line.name, units = line.units, revenue = %line.revenue, "Product sales");
    }

    let monthly = system.reports.report_this_month().await?;
    info!(
        orders = monthly.orders_count,
        revenue = %monthly.total_revenue,
        "Month to date"
    );

    let history = system.accounts.order_history(alice.id).await?;
    info!(user_id = %alice.id, orders = history.len(), "Alice's order history");

    let span = tracing::info_span!("account_maintenance");
    async {
        if let Some(found) = system.accounts.user_by_email("bob@example.com").await? {
            info!(user_id = %found.id, "Bob looked up by email");
        }

        system.accounts.deactivate_user(bob.id).await?;
        let active = system.accounts.active_users().await?;
        info!(active = active.len(), "Active accounts after Bob closed his");

        // Deactivation keeps the record, it only blocks sign-in.
        if let Some(record) = system.accounts.user(bob.id).await? {
            info!(user_id = %record.id, active = record.active, "Bob's record retained");
        }

        Ok::<_, StoreError>(())
    }
    .instrument(span)
    .await?;

    let span = tracing::info_span!("closing_audit");
    async {
        let products_on_file = system.catalog.all_products().await?;
        let users_on_file = system.accounts.all_users().await?;
        let orders_on_file = system.orders.all_orders().await?;
        info!(
            products = products_on_file.len(),
            users = users_on_file.len(),
            orders = orders_on_file.len(),
            "Back office records"
        );

        let inventory = system.reports.inventory_report().await?;
        info!(
            active = inventory.active_products,
            out_of_stock = inventory.out_of_stock,
            value = %inventory.inventory_value,
            "Inventory snapshot"
        );

        Ok::<_, StoreError>(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}

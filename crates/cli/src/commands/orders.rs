//! Dashboard and order commands.

use foodtruck_core::{OrderId, OrderStatus};
use foodtruck_storefront::AppError;
use foodtruck_storefront::models::Order;
use foodtruck_storefront::services::admin::{AdminService, OrderFilter};

pub async fn dashboard(admin: &AdminService) -> Result<(), AppError> {
    let stats = admin.dashboard().await?;
    println!("Total sales:    {}", stats.total_sales);
    println!("Orders:         {}", stats.total_orders);
    println!("Pending:        {}", stats.pending_orders);
    println!("Customers:      {}", stats.total_users);
    if !stats.recent_orders.is_empty() {
        println!();
        println!("Recent orders");
        for order in &stats.recent_orders {
            print_order(order);
        }
    }
    Ok(())
}

pub async fn list(
    admin: &AdminService,
    search: String,
    status: Option<OrderStatus>,
) -> Result<(), AppError> {
    let orders = admin.orders(&OrderFilter { search, status }).await?;
    if orders.is_empty() {
        println!("No orders found");
    }
    for order in &orders {
        print_order(order);
    }
    Ok(())
}

pub async fn show(admin: &AdminService, id: OrderId) -> Result<(), AppError> {
    let entry = admin.order(id).await?;
    print_order(&entry.order);
    println!("  Deliver to: {}", entry.order.delivery_address);
    for item in &entry.items {
        let name = item.product_name.as_deref().unwrap_or("(removed product)");
        println!("  {:>3} x {name:<28} {}", item.quantity, item.line_total());
        if let Some(note) = &item.note {
            println!("        note: {note}");
        }
    }
    Ok(())
}

fn print_order(order: &Order) {
    println!(
        "{}  {}  {:<16} {}",
        order.id,
        order.created_at.format("%d/%m/%Y %H:%M"),
        order.status.label(),
        order.total
    );
}

//! Prints the signature Razorpay's checkout widget would hand back for a payment. Handy for poking the
//! `/api/verify-payment` endpoint by hand.
//!
//! ```text
//! cargo run --example checkout_signature -- <key_secret> <order_id> <payment_id>
//! ```
use bb_payment_engine::helpers::{payment_message, sign};

fn main() {
    let mut args = std::env::args();
    args.next(); // executable name
    let Some(secret) = args.next() else {
        println!("Key secret is required");
        return;
    };
    let Some(order_id) = args.next() else {
        println!("Order ID is required");
        return;
    };
    let Some(payment_id) = args.next() else {
        println!("Payment ID is required");
        return;
    };
    let message = payment_message(&order_id, &payment_id);
    match sign(secret.as_bytes(), message.as_bytes()) {
        Some(signature) => println!("razorpay_signature: {signature}"),
        None => eprintln!("Invalid input. The key secret cannot be empty."),
    }
}

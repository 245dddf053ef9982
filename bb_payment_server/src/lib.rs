//! # BharatBartan payment server
//! This crate hosts the HTTP server for the BharatBartan storefront. It is responsible for:
//! Opening Razorpay orders for the storefront's checkout widget.
//! Verifying payments, both when the storefront reports them and when Razorpay's webhooks do, and reconciling them
//! with the order store.
//! Recording orders, and letting administrators review them and change their status.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/create-order`, `/api/get-razorpay-key`: Checkout set-up.
//! * `/api/verify-payment`: The checkout widget's success callback.
//! * `/webhook/razorpay`: Razorpay webhook deliveries.
//! * `/api/order`, `/api/save-order`: Order submission.
//! * `/api/orders`, `/api/orders/{id}`, `/api/orders/{id}/status`: Order administration. Requires the `Admin` role.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

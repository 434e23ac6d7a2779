mod helpers;
mod mocks;

mod auth;
mod jobs;
mod transactions;
mod webhooks;

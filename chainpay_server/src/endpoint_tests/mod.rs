mod helpers;
mod mocks;
mod queries;
mod webhooks;

pub mod execution_client;

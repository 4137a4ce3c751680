pub mod appliance_api;

pub mod bitbucket_cloud;
pub mod bitbucket_server;
pub mod github;
pub mod http;
pub mod octane;

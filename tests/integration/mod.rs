mod dispatch_tests;
mod engine_tests;
mod github_tests;
mod jenkins_tests;

use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "BASE_URL", default = "http://localhost:8080/")]
    pub base_url: String,
    #[envconfig(from = "CODE_LENGTH", default = "6")]
    pub code_length: usize,
}

use envconfig::Envconfig;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "ABOUT_STORAGE_DIR", default = "Storage")]
    pub storage_dir: String,
}

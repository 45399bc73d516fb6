use alloc::string::String;

use spin::Once;

pub struct Params {
    map: hashbrown::HashMap<String, String>,
}

impl Params {
    pub fn new() -> Params {
        Params {
            map: hashbrown::HashMap::<String, String>::new(),
        }
    }

    pub fn parse(params: &str) -> Params {
        let mut prms = Params::new();
        for param in params.split_ascii_whitespace() {
            if let Some((key, val)) = param.split_once('=') {
                prms.put(key, val);
            }
        }

        prms
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.map.get(key)
    }

    pub fn put(&mut self, key: &str, value: &str) {
        self.map.insert(String::from(key), String::from(value));
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let val = self.get(key)?;

        match val.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                logln!("[ WARN ] ignoring kernel param {}={}: not a number", key, val);
                None
            }
        }
    }
}

impl Default for Params {
    fn default() -> Params {
        Params::new()
    }
}

static PARAMS: Once<Params> = Once::new();

pub fn init(params: &str) {
    PARAMS.call_once(|| {
        let prms = Params::parse(params);
        for (key, val) in prms.map.iter() {
            logln!("kernel param added {} = {}", key, val);
        }

        prms
    });

    crate::kernel::output::debug::init();
}

pub fn params() -> Option<&'static Params> {
    PARAMS.get()
}

pub fn get(key: &str) -> Option<&'static String> {
    params()?.get(key)
}

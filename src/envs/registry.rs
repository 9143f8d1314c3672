//! 环境注册表

use crate::config::Config;
use crate::envs::{RopodEnv, RopodNavDiscreteEnv};
use crate::error::{ConfigError, EnvError, EnvResult};

pub const ROPOD_ENV_ID: &str = "ropod-v0";
pub const ROPOD_NAV_DISCRETE_ENV_ID: &str = "ropod-nav-discrete-v0";

/// 已注册的环境 ID
pub const REGISTERED_IDS: [&str; 2] = [ROPOD_ENV_ID, ROPOD_NAV_DISCRETE_ENV_ID];

/// 由 `make` 创建的环境
pub enum RegisteredEnv {
    Ropod(RopodEnv),
    RopodNavDiscrete(RopodNavDiscreteEnv),
}

impl RegisteredEnv {
    pub fn id(&self) -> &'static str {
        match self {
            RegisteredEnv::Ropod(_) => ROPOD_ENV_ID,
            RegisteredEnv::RopodNavDiscrete(_) => ROPOD_NAV_DISCRETE_ENV_ID,
        }
    }

    pub fn into_nav_discrete(self) -> Option<RopodNavDiscreteEnv> {
        match self {
            RegisteredEnv::RopodNavDiscrete(env) => Some(env),
            RegisteredEnv::Ropod(_) => None,
        }
    }
}

/// 检查环境 ID 是否已注册
pub fn check_id(id: &str) -> EnvResult<()> {
    if REGISTERED_IDS.contains(&id) {
        Ok(())
    } else {
        Err(EnvError::Config(ConfigError::UnknownEnvId { id: id.to_string() }))
    }
}

/// 按 ID 创建并启动环境
///
/// # 参数
/// - `id`: 环境 ID
/// - `config`: 环境配置
pub async fn make(id: &str, config: Config) -> EnvResult<RegisteredEnv> {
    check_id(id)?;
    match id {
        ROPOD_NAV_DISCRETE_ENV_ID => Ok(RegisteredEnv::RopodNavDiscrete(
            RopodNavDiscreteEnv::launch(config).await?,
        )),
        _ => Ok(RegisteredEnv::Ropod(RopodEnv::launch(config).await?)),
    }
}

use serde::Deserialize;

/// (min, max)
pub type Bounds = (f64, f64);

/// 环境配置参数
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EnvironmentDescription {
    /// 坐标边界 ((min_x, max_x), (min_y, max_y))
    pub boundaries: (Bounds, Bounds),
}

impl EnvironmentDescription {
    pub fn new(x: Bounds, y: Bounds) -> Self {
        Self { boundaries: (x, y) }
    }

    /// 点 (x, y) 是否在边界内（含边界）
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let ((min_x, max_x), (min_y, max_y)) = self.boundaries;
        (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive() {
        let env = EnvironmentDescription::new((-5.0, 5.0), (0.0, 10.0));
        assert!(env.contains(5.0, 0.0));
        assert!(env.contains(0.0, 3.2));
        assert!(!env.contains(5.1, 1.0));
        assert!(!env.contains(0.0, -0.1));
    }

    #[test]
    fn deserializes_from_toml() {
        let env: EnvironmentDescription =
            toml::from_str("boundaries = [[-1.0, 1.0], [-2.0, 2.0]]").unwrap();
        assert_eq!(env.boundaries, ((-1.0, 1.0), (-2.0, 2.0)));
    }
}

//! Declarative macros shared by the metric and platform tables

/// Define a metric enum with automatic `name()` and `all()` implementations
///
/// # Example
/// ```
/// use zensmu::metric_enum;
///
/// metric_enum! {
///     pub enum SmuMetric {
///         MaxFrequency => "MaxFrequencyMHz",
///         CurveOptimizerMargin => "CurveOptimizerMargin",
///     }
/// }
///
/// let metric = SmuMetric::MaxFrequency;
/// assert_eq!(metric.name(), "MaxFrequencyMHz");
/// assert_eq!(SmuMetric::all().len(), 2);
/// ```
///
/// Expands to:
/// - An enum with Debug, Clone, Copy, PartialEq, Eq, Hash derives
/// - A `name(&self) -> &'static str` method
/// - An `all() -> Vec<Self>` method
#[macro_export]
macro_rules! metric_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $str:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}

/// Initialize an exporter with standard error handling
///
/// A failed exporter is logged and left out; the others still run.
///
/// # Example
/// ```ignore
/// // In orchestrator::collector::MetricCollector::new()
/// init_exporter!(
///     collector,
///     collector_config,
///     config,
///     session,
///     pm_table_exporter,
///     pm_table,
///     PmTableMetricExporter<T>,
///     "PM table"
/// );
/// ```
#[macro_export]
macro_rules! init_exporter {
    (
        $collector:expr,
        $collector_config:expr,
        $config:expr,
        $session:expr,
        $field:ident,
        $flag:ident,
        $Exporter:ty,
        $name:literal
    ) => {
        if $collector_config.$flag {
            match <$Exporter>::new($config.clone(), std::sync::Arc::clone(&$session)) {
                Ok(exporter) => {
                    $collector.$field = Some(std::sync::Arc::new(exporter));
                    tracing::info!(concat!($name, " exporter initialized"));
                }
                Err(e) => {
                    tracing::error!(concat!("Failed to initialize ", $name, " exporter: {}"), e);
                }
            }
        }
    };
}

/// Spawn a collector task for an exporter if it exists
///
/// # Example
/// ```ignore
/// // In orchestrator::collector::MetricCollector::collection_loop()
/// let mut tasks = Vec::new();
/// spawn_collector!(tasks, &self.smu_exporter);
/// ```
#[macro_export]
macro_rules! spawn_collector {
    ($tasks:expr, $exporter:expr) => {
        if let Some(exporter) = $exporter {
            let exp = std::sync::Arc::clone(exporter);
            $tasks.push(tokio::spawn(async move {
                exp.collect().await;
            }));
        }
    };
}

/// Gather metrics from an exporter's registry
///
/// # Example
/// ```ignore
/// // In main.rs metrics handler
/// let mut buffer = Vec::new();
/// gather_metrics!(buffer, encoder, state.smu_exporter, "SMU");
/// ```
#[macro_export]
macro_rules! gather_metrics {
    ($buffer:expr, $encoder:expr, $exporter:expr, $name:literal) => {
        if let Some(ref exporter) = $exporter {
            let metric_families = exporter.registry().gather();
            if let Err(e) = $encoder.encode(&metric_families, &mut $buffer) {
                tracing::error!(concat!("Failed to encode ", $name, " metrics: {}"), e);
            }
        }
    };
}

/// Define an enum with name() and all() methods, plus custom data per variant
///
/// # Example
/// ```
/// use zensmu::enum_with_data;
///
/// enum_with_data! {
///     pub enum Family: u32 {
///         Zen => ("Zen", 0x17),
///         Zen3 => ("Zen3", 0x19),
///     }
///     impl id -> u32
/// }
///
/// let family = Family::Zen3;
/// assert_eq!(family.name(), "Zen3");
/// assert_eq!(family.id(), 0x19);
/// ```
#[macro_export]
macro_rules! enum_with_data {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $data_type:ty {
            $($variant:ident => ($str:literal, $data:expr)),* $(,)?
        }
        impl $method:ident -> $return_type:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn $method(&self) -> $return_type {
                match self {
                    $($name::$variant => $data,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}

use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("读取文件失败: {0}")]
    Import(String),

    #[error("写入结果失败: {0}")]
    Export(String),

    #[error("{0}")]
    Config(String),

    #[error("无效的列标识 '{0}'")]
    InvalidColumn(String),

    #[error("{role}中的列标识 {column} 超出范围（表格只有 {width} 列，从A到{last}）")]
    ColumnOutOfRange {
        role: String,
        column: String,
        width: usize,
        last: String,
    },

    #[error("请至少选择一个匹配列")]
    MissingKeyColumns,

    #[error("请至少选择一个返回列")]
    MissingReturnColumns,

    #[error("主表匹配列数量（{main}）与查找表匹配列数量（{lookup}）不一致")]
    KeyArity { main: usize, lookup: usize },

    #[error("未找到任何匹配的数据，请检查匹配条件是否正确")]
    NoMatchFound,

    #[error("请至少选择一个行标签")]
    MissingRowLabels,

    #[error("请至少选择一个值字段")]
    MissingValueColumns,

    #[error("列 '{column}' 是非数值类型，只支持计数操作")]
    UnsupportedAggregation { column: String },

    #[error("不支持的聚合函数 '{0}'（可选: sum, mean, count, max, min）")]
    UnknownAggregation(String),

    #[error("表格格式错误: {0}")]
    MalformedTable(String),
}

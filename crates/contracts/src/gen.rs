use ethers::contract::abigen;

abigen!(
    EntryPointAPI,
    r#"[
        struct PackedUserOperation {address sender;uint256 nonce;bytes initCode;bytes callData;bytes32 accountGasLimits;uint256 preVerificationGas;bytes32 gasFees;bytes paymasterAndData;bytes signature;}
        function handleOps(PackedUserOperation[] calldata ops,address payable beneficiary) external
        function handleAtomicOps(PackedUserOperation[] calldata ops,address payable beneficiary) external
        function balanceOf(address account) external view returns (uint256)
        function depositTo(address account) external payable
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
        function getUserOpHash(PackedUserOperation calldata userOp) external view returns (bytes32)
        error FailedOp(uint256 opIndex, string reason)
        error FailedOpWithRevert(uint256 opIndex, string reason, bytes inner)
        event UserOperationEvent(bytes32 indexed userOpHash,address indexed sender,address indexed paymaster,uint256 nonce,bool success,uint256 actualGasCost,uint256 actualGasUsed)
        event UserOperationRevertReason(bytes32 indexed userOpHash,address indexed sender,uint256 nonce,bytes revertReason)
    ]"#
);

abigen!(
    SimpleAccountFactoryAPI,
    r#"[
        function createAccount(address owner,uint256 salt) returns (address ret)
        function getAddress(address owner,uint256 salt) view returns (address)
    ]"#
);

abigen!(
    SimpleAccountAPI,
    r#"[
        function execute(address dest, uint256 value, bytes calldata func)
        function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func)
    ]"#
);
